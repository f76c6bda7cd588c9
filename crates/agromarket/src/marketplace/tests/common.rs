use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::config::MarketplaceConfig;
use crate::marketplace::alerts::{
    Alert, AlertCategoryId, AlertDraft, AlertId, AlertRepository, AlertService, ScopeKind,
};
use crate::marketplace::categories::{Category, CategoryId, CategoryTree};
use crate::marketplace::geography::{
    AdministrativeHierarchy, DepartmentId, MunicipalityId, MunicipalityRef,
};
use crate::marketplace::listings::{
    Listing, ListingDraft, ListingId, ListingRepository, ListingService, ListingStatus, Observed,
    RepositoryError, UserId, Visibility,
};
use crate::marketplace::marketplace_router;

pub(super) const ANTIOQUIA: DepartmentId = DepartmentId(5);
pub(super) const CUNDINAMARCA: DepartmentId = DepartmentId(25);
pub(super) const MEDELLIN: MunicipalityRef = MunicipalityRef::new(MunicipalityId(5001), ANTIOQUIA);
pub(super) const ENVIGADO: MunicipalityRef = MunicipalityRef::new(MunicipalityId(5266), ANTIOQUIA);
pub(super) const SOACHA: MunicipalityRef = MunicipalityRef::new(MunicipalityId(25754), CUNDINAMARCA);

pub(super) const FRUITS: CategoryId = CategoryId(1);
pub(super) const CITRUS: CategoryId = CategoryId(2);
pub(super) const TROPICAL: CategoryId = CategoryId(3);
pub(super) const VEGETABLES: CategoryId = CategoryId(4);

pub(super) const OWNER: UserId = UserId(10);
pub(super) const OTHER_OWNER: UserId = UserId(11);
pub(super) const MODERATOR: UserId = UserId(90);

pub(super) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn now() -> DateTime<Utc> {
    at(10, 12)
}

pub(super) fn hierarchy() -> AdministrativeHierarchy {
    let export = "department_id,department_name,municipality_id,municipality_name\n\
                  5,Antioquia,5001,Medellin\n\
                  5,Antioquia,5266,Envigado\n\
                  25,Cundinamarca,25754,Soacha\n";
    AdministrativeHierarchy::from_reader(export.as_bytes()).expect("hierarchy parses")
}

pub(super) fn categories() -> CategoryTree {
    CategoryTree::new([
        Category {
            id: FRUITS,
            name: "Frutas".to_string(),
            parent: None,
            is_active: true,
        },
        Category {
            id: CITRUS,
            name: "Citricos".to_string(),
            parent: Some(FRUITS),
            is_active: true,
        },
        Category {
            id: TROPICAL,
            name: "Tropicales".to_string(),
            parent: Some(FRUITS),
            is_active: false,
        },
        Category {
            id: VEGETABLES,
            name: "Verduras".to_string(),
            parent: None,
            is_active: true,
        },
    ])
}

pub(super) fn draft(title: &str, price: i64) -> ListingDraft {
    ListingDraft {
        title: title.to_string(),
        description: format!("{title} from the highlands"),
        category: Some(CITRUS),
        price: Decimal::from(price),
        quantity: Decimal::from(100),
        unit_of_measure: "kg".to_string(),
        images: Vec::new(),
        municipality: Some(MEDELLIN.id),
        visibility: Visibility::Public,
        expires_at: None,
    }
}

/// Listing fixture placed directly into `status`, bypassing the lifecycle engine.
pub(super) fn listing(id: &str, status: ListingStatus) -> Listing {
    let mut listing = Listing::create(
        ListingId(id.to_string()),
        OWNER,
        draft(id, 20),
        &hierarchy(),
        at(1, 8),
    )
    .expect("valid listing");
    listing.status = status;
    if status != ListingStatus::PendingReview {
        listing.published_at = Some(at(2, 8));
    }
    listing
}

pub(super) fn listing_created(id: &str, status: ListingStatus, created: DateTime<Utc>) -> Listing {
    let mut listing = listing(id, status);
    listing.created_at = created;
    listing.updated_at = created;
    listing
}

pub(super) fn private(mut listing: Listing) -> Listing {
    listing.visibility = Visibility::Private;
    listing
}

pub(super) fn expiring(mut listing: Listing, expires_at: DateTime<Utc>) -> Listing {
    listing.expires_at = Some(expires_at);
    listing
}

pub(super) fn marketplace_config() -> MarketplaceConfig {
    MarketplaceConfig::default()
}

pub(super) fn build_service() -> (ListingService<MemoryRepository>, Arc<MemoryRepository>) {
    build_service_with(marketplace_config())
}

pub(super) fn build_service_with(
    config: MarketplaceConfig,
) -> (ListingService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = service_over(repository.clone(), &config);
    (service, repository)
}

pub(super) fn service_over<R>(repository: Arc<R>, config: &MarketplaceConfig) -> ListingService<R>
where
    R: ListingRepository + 'static,
{
    ListingService::new(repository, config, categories(), Arc::new(hierarchy()))
}

pub(super) fn build_alert_service() -> (AlertService<MemoryAlerts>, Arc<MemoryAlerts>) {
    let repository = Arc::new(MemoryAlerts::default());
    let service = AlertService::new(repository.clone(), Arc::new(hierarchy()));
    (service, repository)
}

pub(super) fn alert_draft(title: &str, scope: ScopeKind, department: Option<DepartmentId>) -> AlertDraft {
    AlertDraft {
        title: title.to_string(),
        message: format!("{title}: check your crops"),
        category: AlertCategoryId(3),
        scope,
        department,
        images: Vec::new(),
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<ListingId, Listing>>>,
}

impl MemoryRepository {
    pub(super) fn put(&self, listing: Listing) {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .insert(listing.id.clone(), listing);
    }

    pub(super) fn stored(&self, id: &str) -> Listing {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(&ListingId(id.to_string()))
            .cloned()
            .expect("listing stored")
    }

    pub(super) fn list_ids(&self) -> Vec<ListingId> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

impl ListingRepository for MemoryRepository {
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
        let current = guard.get(&listing.id).ok_or(RepositoryError::NotFound)?;
        observed.verify(current)?;
        let stored = listing.next_revision(current);
        guard.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    fn record_view(&self, id: &ListingId) -> Result<Listing, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let current = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        current.view_count += 1;
        Ok(current.clone())
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

/// Loses every write to a concurrent writer that keeps the status unchanged.
#[derive(Default)]
pub(super) struct StaleRepository {
    pub(super) inner: MemoryRepository,
    pub(super) swaps: AtomicU32,
}

impl StaleRepository {
    pub(super) fn swap_count(&self) -> u32 {
        self.swaps.load(Ordering::SeqCst)
    }
}

impl ListingRepository for StaleRepository {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError> {
        self.inner.insert(listing)
    }

    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn compare_and_swap(
        &self,
        observed: Observed,
        _listing: Listing,
    ) -> Result<Listing, RepositoryError> {
        self.swaps.fetch_add(1, Ordering::SeqCst);
        Err(RepositoryError::StaleStatus {
            expected: observed.status,
            found: observed.status,
        })
    }

    fn record_view(&self, id: &ListingId) -> Result<Listing, RepositoryError> {
        self.inner.record_view(id)
    }

    fn list(&self) -> Result<Vec<Listing>, RepositoryError> {
        self.inner.list()
    }

    fn by_owner(&self, owner: UserId) -> Result<Vec<Listing>, RepositoryError> {
        self.inner.by_owner(owner)
    }
}

type Interference = Box<dyn Fn(&MemoryRepository, &ListingId) + Send + Sync>;

/// Lets a competing writer touch the listing right before the first swap lands.
pub(super) struct RacingRepository {
    pub(super) inner: MemoryRepository,
    interfere: Interference,
    raced: Mutex<bool>,
}

impl RacingRepository {
    /// The competitor moves the listing to `winner`.
    pub(super) fn new(winner: ListingStatus) -> Self {
        Self::interleaving(move |listing| listing.status = winner)
    }

    /// The competitor applies `edit` as a full write of its own.
    pub(super) fn interleaving(edit: impl Fn(&mut Listing) + Send + Sync + 'static) -> Self {
        Self::with(Box::new(move |inner: &MemoryRepository, id: &ListingId| {
            let mut competitor = inner.stored(&id.0);
            edit(&mut competitor);
            competitor.version += 1;
            inner.put(competitor);
        }))
    }

    /// A visitor opens the listing.
    pub(super) fn viewed() -> Self {
        Self::with(Box::new(|inner: &MemoryRepository, id: &ListingId| {
            inner.record_view(id).expect("listing stored");
        }))
    }

    fn with(interfere: Interference) -> Self {
        Self {
            inner: MemoryRepository::default(),
            interfere,
            raced: Mutex::new(false),
        }
    }
}

impl ListingRepository for RacingRepository {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError> {
        self.inner.insert(listing)
    }

    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn compare_and_swap(
        &self,
        observed: Observed,
        listing: Listing,
    ) -> Result<Listing, RepositoryError> {
        let mut raced = self.raced.lock().expect("race mutex poisoned");
        if !*raced {
            *raced = true;
            (self.interfere)(&self.inner, &listing.id);
        }
        self.inner.compare_and_swap(observed, listing)
    }

    fn record_view(&self, id: &ListingId) -> Result<Listing, RepositoryError> {
        self.inner.record_view(id)
    }

    fn list(&self) -> Result<Vec<Listing>, RepositoryError> {
        self.inner.list()
    }

    fn by_owner(&self, owner: UserId) -> Result<Vec<Listing>, RepositoryError> {
        self.inner.by_owner(owner)
    }
}

pub(super) struct UnavailableRepository;

impl ListingRepository for UnavailableRepository {
    fn insert(&self, _listing: Listing) -> Result<Listing, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn compare_and_swap(
        &self,
        _observed: Observed,
        _listing: Listing,
    ) -> Result<Listing, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn record_view(&self, _id: &ListingId) -> Result<Listing, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<Listing>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn by_owner(&self, _owner: UserId) -> Result<Vec<Listing>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAlerts {
    records: Arc<Mutex<Vec<Alert>>>,
}

impl MemoryAlerts {
    pub(super) fn count(&self) -> usize {
        self.records.lock().expect("alert mutex poisoned").len()
    }
}

impl AlertRepository for MemoryAlerts {
    fn insert(&self, alert: Alert) -> Result<Alert, RepositoryError> {
        let mut guard = self.records.lock().expect("alert mutex poisoned");
        if guard.iter().any(|existing| existing.id == alert.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(alert.clone());
        Ok(alert)
    }

    fn fetch(&self, id: &AlertId) -> Result<Option<Alert>, RepositoryError> {
        let guard = self.records.lock().expect("alert mutex poisoned");
        Ok(guard.iter().find(|alert| &alert.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<Alert>, RepositoryError> {
        Ok(self.records.lock().expect("alert mutex poisoned").clone())
    }
}

pub(super) fn router_with<R>(service: ListingService<R>) -> axum::Router
where
    R: ListingRepository + 'static,
{
    let (alerts, _) = build_alert_service();
    marketplace_router(Arc::new(service), Arc::new(alerts))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
