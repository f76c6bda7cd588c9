use agromarket::config::MarketplaceConfig;
use agromarket::error::AppError;
use agromarket::marketplace::alerts::{Alert, AlertId, AlertRepository};
use agromarket::marketplace::categories::{Category, CategoryId, CategoryTree};
use agromarket::marketplace::geography::AdministrativeHierarchy;
use agromarket::marketplace::listings::{
    Listing, ListingId, ListingRepository, Observed, RepositoryError, UserId,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::fs::File;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Departments and municipalities used when no export is configured.
const SAMPLE_GEOGRAPHY: &str = "\
department_id,department_name,municipality_id,municipality_name
5,Antioquia,5001,Medellin
5,Antioquia,5266,Envigado
5,Antioquia,5615,Rionegro
15,Boyaca,15001,Tunja
15,Boyaca,15759,Sogamoso
25,Cundinamarca,25754,Soacha
25,Cundinamarca,25899,Zipaquira
73,Tolima,73001,Ibague
";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryListingRepository {
    records: Arc<Mutex<HashMap<ListingId, Listing>>>,
}

impl ListingRepository for InMemoryListingRepository {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&listing.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(listing.id.clone(), listing.clone());
        Ok(listing)
    }

    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn compare_and_swap(
        &self,
        observed: Observed,
        listing: Listing,
    ) -> Result<Listing, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let Some(current) = guard.get(&listing.id) else {
            return Err(RepositoryError::NotFound);
        };
        observed.verify(current)?;
        let stored = listing.next_revision(current);
        guard.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    fn record_view(&self, id: &ListingId) -> Result<Listing, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get_mut(id) {
            Some(listing) => {
                listing.view_count = listing.view_count.saturating_add(1);
                Ok(listing.clone())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn list(&self) -> Result<Vec<Listing>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn by_owner(&self, owner: UserId) -> Result<Vec<Listing>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|listing| listing.owner == owner)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAlertRepository {
    alerts: Arc<Mutex<Vec<Alert>>>,
}

impl AlertRepository for InMemoryAlertRepository {
    fn insert(&self, alert: Alert) -> Result<Alert, RepositoryError> {
        let mut guard = self.alerts.lock().expect("alert mutex poisoned");
        if guard.iter().any(|existing| existing.id == alert.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(alert.clone());
        Ok(alert)
    }

    fn fetch(&self, id: &AlertId) -> Result<Option<Alert>, RepositoryError> {
        let guard = self.alerts.lock().expect("alert mutex poisoned");
        Ok(guard.iter().find(|alert| &alert.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<Alert>, RepositoryError> {
        Ok(self.alerts.lock().expect("alert mutex poisoned").clone())
    }
}

/// Load the configured geography export, or the bundled sample when none is set.
pub(crate) fn load_hierarchy(config: &MarketplaceConfig) -> Result<AdministrativeHierarchy, AppError> {
    let hierarchy = match &config.geography_csv {
        Some(path) => AdministrativeHierarchy::from_reader(File::open(path)?)?,
        None => AdministrativeHierarchy::from_reader(SAMPLE_GEOGRAPHY.as_bytes())?,
    };
    info!(
        departments = hierarchy.department_count(),
        municipalities = hierarchy.municipality_count(),
        "geography loaded"
    );
    Ok(hierarchy)
}

pub(crate) fn default_categories() -> CategoryTree {
    let category = |id: u32, name: &str, parent: Option<u32>| Category {
        id: CategoryId(id),
        name: name.to_string(),
        parent: parent.map(CategoryId),
        is_active: true,
    };

    CategoryTree::new([
        category(1, "Frutas", None),
        category(2, "Citricos", Some(1)),
        category(3, "Tropicales", Some(1)),
        category(4, "Hortalizas", None),
        category(5, "Tuberculos", Some(4)),
        category(6, "Granos", None),
        category(7, "Cafe", Some(6)),
    ])
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as an RFC 3339 timestamp ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_geography_loads_without_configuration() {
        let hierarchy =
            load_hierarchy(&MarketplaceConfig::default()).expect("bundled export parses");
        assert_eq!(hierarchy.department_count(), 4);
        assert_eq!(hierarchy.municipality_count(), 8);
    }

    #[test]
    fn timestamps_must_be_rfc3339() {
        let parsed = parse_timestamp("2025-03-10T12:00:00-05:00").expect("valid timestamp");
        assert_eq!(parsed.to_rfc3339(), "2025-03-10T17:00:00+00:00");
        assert!(parse_timestamp("10/03/2025").is_err());
    }
}
