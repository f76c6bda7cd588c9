use super::domain::{Alert, AlertId};
use crate::marketplace::listings::RepositoryError;

/// Storage abstraction for published alerts.
pub trait AlertRepository: Send + Sync {
    fn insert(&self, alert: Alert) -> Result<Alert, RepositoryError>;
    fn fetch(&self, id: &AlertId) -> Result<Option<Alert>, RepositoryError>;
    fn list(&self) -> Result<Vec<Alert>, RepositoryError>;
}
