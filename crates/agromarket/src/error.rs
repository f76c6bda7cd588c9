use crate::config::ConfigError;
use crate::marketplace::geography::GeographyError;
use crate::telemetry::TelemetryError;
use std::fmt;

/// Failures that stop the service or a CLI command before any request is handled.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Geography(GeographyError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {err}"),
            AppError::Telemetry(err) => write!(f, "telemetry error: {err}"),
            AppError::Io(err) => write!(f, "io error: {err}"),
            AppError::Server(err) => write!(f, "server error: {err}"),
            AppError::Geography(err) => write!(f, "geography data error: {err}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Geography(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<GeographyError> for AppError {
    fn from(value: GeographyError) -> Self {
        Self::Geography(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::geography::MunicipalityId;
    use std::error::Error as _;

    #[test]
    fn geography_failures_keep_their_source() {
        let err = AppError::from(GeographyError::UnknownMunicipality(MunicipalityId(99)));
        assert!(err.to_string().starts_with("geography data error:"));
        assert!(err.source().is_some_and(|source| source.is::<GeographyError>()));
    }
}
