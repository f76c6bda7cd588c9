use crate::demo::{run_demo, run_sweep, DemoArgs, SweepArgs};
use crate::server;
use agromarket::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Agricultural Marketplace",
    about = "Run the agricultural marketplace service or its command-line walk-throughs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk a listing through review, sale and reactivation, then resolve alert audiences
    Demo(DemoArgs),
    /// Seed the demo catalogue and run the expiry sweep once
    Sweep(SweepArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seconds between background expiry sweeps; 0 disables the sweeper
    #[arg(long, default_value_t = 3600)]
    pub(crate) sweep_interval_secs: u64,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or_else(|| {
        Command::Serve(ServeArgs {
            sweep_interval_secs: 3600,
            ..ServeArgs::default()
        })
    });

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Sweep(args) => run_sweep(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_parsed_with_overrides() {
        let cli = Cli::try_parse_from(["agromarket-api", "serve", "--port", "8081"])
            .expect("arguments parse");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.port, Some(8081));
                assert_eq!(args.sweep_interval_secs, 3600);
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn sweep_accepts_reference_time() {
        let cli = Cli::try_parse_from([
            "agromarket-api",
            "sweep",
            "--now",
            "2025-03-10T12:00:00Z",
            "--after-days",
            "5",
        ])
        .expect("arguments parse");
        match cli.command {
            Some(Command::Sweep(args)) => {
                assert_eq!(args.after_days, 5);
                assert!(args.now.is_some());
            }
            other => panic!("expected sweep, got {other:?}"),
        }
    }
}
