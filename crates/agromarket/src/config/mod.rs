use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::marketplace::listings::ReviewNotesPolicy;

pub const DEFAULT_TRANSITION_ATTEMPTS: u32 = 3;
pub const DEFAULT_QUEUE_PAGE_SIZE: usize = 20;
const MAX_QUEUE_PAGE_SIZE: usize = 100;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the marketplace service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub marketplace: MarketplaceConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            marketplace: MarketplaceConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Marketplace rules that vary per deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceConfig {
    /// What happens when a moderator rejects without notes.
    pub review_notes: ReviewNotesPolicy,
    /// Optimistic-concurrency attempts per status change, at least 1.
    pub transition_attempts: u32,
    /// Default moderation queue page size.
    pub queue_page_size: usize,
    /// Department/municipality export loaded at startup.
    pub geography_csv: Option<PathBuf>,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            review_notes: ReviewNotesPolicy::default(),
            transition_attempts: DEFAULT_TRANSITION_ATTEMPTS,
            queue_page_size: DEFAULT_QUEUE_PAGE_SIZE,
            geography_csv: None,
        }
    }
}

impl MarketplaceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = env::var("MARKET_REVIEW_NOTES") {
            config.review_notes = raw
                .parse()
                .map_err(|_| ConfigError::InvalidReviewPolicy { value: raw })?;
        }

        if let Ok(raw) = env::var("MARKET_TRANSITION_ATTEMPTS") {
            config.transition_attempts = match raw.trim().parse::<u32>() {
                Ok(attempts) if attempts >= 1 => attempts,
                _ => return Err(ConfigError::InvalidAttempts { value: raw }),
            };
        }

        if let Ok(raw) = env::var("MARKET_QUEUE_PAGE_SIZE") {
            config.queue_page_size = match raw.trim().parse::<usize>() {
                Ok(size) if (1..=MAX_QUEUE_PAGE_SIZE).contains(&size) => size,
                _ => return Err(ConfigError::InvalidPageSize { value: raw }),
            };
        }

        config.geography_csv = env::var("MARKET_GEOGRAPHY_CSV")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(config)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidReviewPolicy { value: String },
    InvalidAttempts { value: String },
    InvalidPageSize { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidReviewPolicy { value } => write!(
                f,
                "MARKET_REVIEW_NOTES must be 'warn' or 'require', got '{value}'"
            ),
            ConfigError::InvalidAttempts { value } => write!(
                f,
                "MARKET_TRANSITION_ATTEMPTS must be a positive integer, got '{value}'"
            ),
            ConfigError::InvalidPageSize { value } => write!(
                f,
                "MARKET_QUEUE_PAGE_SIZE must be between 1 and {MAX_QUEUE_PAGE_SIZE}, got '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
