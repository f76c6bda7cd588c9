use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::domain::{Alert, AlertDraft, AlertId, AlertValidation};
use super::query::AlertQuery;
use super::repository::AlertRepository;
use crate::marketplace::geography::{AdministrativeHierarchy, GeographyError, MunicipalityId};
use crate::marketplace::listings::{Actor, RepositoryError};
use crate::marketplace::scope::{has_location, resolve_alert_audience, FilterError};

static ALERT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_alert_id() -> AlertId {
    let id = ALERT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AlertId(format!("alr-{id:06}"))
}

/// Alerts visible to one viewer.
#[derive(Debug, Clone, Serialize)]
pub struct AlertFeed {
    /// False means the viewer must complete their location before any alert applies.
    pub has_location: bool,
    pub alerts: Vec<Alert>,
}

/// Service publishing alerts and resolving which of them a viewer sees.
pub struct AlertService<R> {
    repository: Arc<R>,
    hierarchy: Arc<AdministrativeHierarchy>,
}

impl<R> AlertService<R>
where
    R: AlertRepository + 'static,
{
    pub fn new(repository: Arc<R>, hierarchy: Arc<AdministrativeHierarchy>) -> Self {
        Self {
            repository,
            hierarchy,
        }
    }

    /// Publish a new alert. Moderators only.
    pub fn publish(
        &self,
        actor: Actor,
        draft: AlertDraft,
        now: DateTime<Utc>,
    ) -> Result<Alert, AlertServiceError> {
        let Actor::Moderator(moderator) = actor else {
            return Err(AlertServiceError::Forbidden);
        };

        let alert = Alert::create(next_alert_id(), moderator, draft, now)?;
        if let Some(department) = alert.scope.department() {
            if self.hierarchy.department(department).is_none() {
                return Err(GeographyError::UnknownDepartment(department).into());
            }
        }

        let stored = self.repository.insert(alert)?;
        info!(alert = %stored.id, scope = stored.scope.kind().label(), "alert published");
        Ok(stored)
    }

    pub fn get(&self, id: &AlertId) -> Result<Alert, AlertServiceError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| AlertServiceError::NotFound(id.clone()))
    }

    /// Alerts for a viewer whose profile points at `municipality`, narrowed by `query`.
    pub fn feed(
        &self,
        municipality: Option<MunicipalityId>,
        query: &AlertQuery,
    ) -> Result<AlertFeed, AlertServiceError> {
        let order = query.order()?;
        let location = municipality
            .map(|id| self.hierarchy.resolve(id))
            .transpose()?;

        if !has_location(location.as_ref()) {
            return Ok(AlertFeed {
                has_location: false,
                alerts: Vec::new(),
            });
        }

        let mut alerts: Vec<Alert> = self
            .repository
            .list()?
            .into_iter()
            .filter(|alert| resolve_alert_audience(alert, location.as_ref()) && query.admits(alert))
            .collect();
        AlertQuery::sort(order, &mut alerts);

        Ok(AlertFeed {
            has_location: true,
            alerts,
        })
    }
}

/// Error raised by the alert service.
#[derive(Debug, thiserror::Error)]
pub enum AlertServiceError {
    #[error(transparent)]
    Validation(#[from] AlertValidation),
    #[error(transparent)]
    Geography(#[from] GeographyError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("alert {0} not found")]
    NotFound(AlertId),
    #[error("only moderators may publish alerts")]
    Forbidden,
}
