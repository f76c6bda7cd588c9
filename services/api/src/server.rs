use crate::cli::ServeArgs;
use crate::infra::{
    default_categories, load_hierarchy, AppState, InMemoryAlertRepository,
    InMemoryListingRepository,
};
use crate::routes::with_marketplace_routes;
use agromarket::config::AppConfig;
use agromarket::error::AppError;
use agromarket::marketplace::alerts::AlertService;
use agromarket::marketplace::listings::{ListingRepository, ListingService};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    agromarket::telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let hierarchy = Arc::new(load_hierarchy(&config.marketplace)?);
    let listing_service = Arc::new(ListingService::new(
        Arc::new(InMemoryListingRepository::default()),
        &config.marketplace,
        default_categories(),
        hierarchy.clone(),
    ));
    let alert_service = Arc::new(AlertService::new(
        Arc::new(InMemoryAlertRepository::default()),
        hierarchy,
    ));

    if args.sweep_interval_secs > 0 {
        spawn_expiry_sweeper(
            listing_service.clone(),
            Duration::from_secs(args.sweep_interval_secs),
        );
    }

    let app = with_marketplace_routes(listing_service, alert_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        review_notes = %config.marketplace.review_notes,
        "agricultural marketplace ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

fn spawn_expiry_sweeper<R>(service: Arc<ListingService<R>>, every: Duration)
where
    R: ListingRepository + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(err) = service.sweep_expired(Utc::now()) {
                error!(error = %err, "expiry sweep failed");
            }
        }
    });
}
