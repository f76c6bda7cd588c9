use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{Actor, Listing, ListingDraft, ListingId, ListingStatus, UserId, Visibility};
use super::eligibility::{
    is_active_only, is_eligible, moderation_queue, partition_dashboard, AudienceContext,
    DashboardPartition, Page, PageRequest,
};
use super::filters::{FeedParams, ListingQuery};
use super::lifecycle::{LifecycleEngine, LifecycleError, TransitionOutcome, TransitionRequest};
use super::repository::{ListingRepository, Observed, RepositoryError};
use super::ListingValidation;
use crate::config::MarketplaceConfig;
use crate::marketplace::categories::CategoryTree;
use crate::marketplace::geography::AdministrativeHierarchy;
use crate::marketplace::scope::FilterError;

static LISTING_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_listing_id() -> ListingId {
    let id = LISTING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ListingId(format!("lst-{id:06}"))
}

/// Owner dashboard narrowing, applied before the available/sold split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DashboardFilter {
    #[serde(default)]
    pub status: Option<ListingStatus>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

/// Result of one pass of the expiry sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired: Vec<ListingId>,
    /// Listings that changed underneath the sweep and were left for the next pass.
    pub skipped: Vec<ListingId>,
}

/// Service composing the lifecycle engine, eligibility rules and the listing repository.
pub struct ListingService<R> {
    repository: Arc<R>,
    engine: LifecycleEngine,
    categories: Arc<CategoryTree>,
    hierarchy: Arc<AdministrativeHierarchy>,
    max_attempts: u32,
    queue_page_size: usize,
}

impl<R> ListingService<R>
where
    R: ListingRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        config: &MarketplaceConfig,
        categories: CategoryTree,
        hierarchy: Arc<AdministrativeHierarchy>,
    ) -> Self {
        Self {
            repository,
            engine: LifecycleEngine::new(config.review_notes),
            categories: Arc::new(categories),
            hierarchy,
            max_attempts: config.transition_attempts.max(1),
            queue_page_size: config.queue_page_size,
        }
    }

    pub fn engine(&self) -> &LifecycleEngine {
        &self.engine
    }

    /// Validate and store a new listing in `pending_review`.
    pub fn create(
        &self,
        owner: UserId,
        draft: ListingDraft,
        now: DateTime<Utc>,
    ) -> Result<Listing, ListingServiceError> {
        let listing = Listing::create(next_listing_id(), owner, draft, &self.hierarchy, now)?;
        let stored = self.repository.insert(listing)?;
        info!(listing = %stored.id, owner = stored.owner.0, "listing submitted for review");
        Ok(stored)
    }

    pub fn get(&self, id: &ListingId) -> Result<Listing, ListingServiceError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| ListingServiceError::NotFound(id.clone()))
    }

    /// Validate and persist a status change.
    ///
    /// On an optimistic-concurrency conflict the listing is re-read and the guard re-evaluated,
    /// up to the configured number of attempts.
    pub fn apply_transition(
        &self,
        id: &ListingId,
        request: &TransitionRequest,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, ListingServiceError> {
        for attempt in 1..=self.max_attempts {
            let current = self.get(id)?;
            let outcome = self.engine.apply(&current, request, now)?;

            if !outcome.changed {
                debug!(listing = %id, status = %outcome.previous, "transition is a no-op");
                return Ok(outcome);
            }

            match self
                .repository
                .compare_and_swap(Observed::of(&current), outcome.listing.clone())
            {
                Ok(stored) => {
                    let outcome = TransitionOutcome {
                        listing: stored,
                        ..outcome
                    };
                    for warning in &outcome.warnings {
                        warn!(listing = %id, warning = warning.message(), "transition applied with warning");
                    }
                    info!(
                        listing = %id,
                        from = %outcome.previous,
                        to = %outcome.listing.status(),
                        actor = request.actor.role().label(),
                        "listing transition applied"
                    );
                    return Ok(outcome);
                }
                Err(RepositoryError::StaleStatus { expected, found }) => {
                    warn!(
                        listing = %id,
                        %expected,
                        %found,
                        attempt,
                        "listing changed concurrently, re-evaluating"
                    );
                }
                Err(RepositoryError::StaleVersion { .. }) => {
                    debug!(listing = %id, attempt, "listing edited concurrently, re-evaluating");
                }
                Err(RepositoryError::NotFound) => {
                    return Err(ListingServiceError::NotFound(id.clone()));
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(ListingServiceError::ConcurrentModification {
            listing: id.clone(),
            attempts: self.max_attempts,
        })
    }

    /// Move every active listing whose expiry has passed to `expired`.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepReport, ListingServiceError> {
        let due: Vec<ListingId> = self
            .repository
            .list()?
            .into_iter()
            .filter(|listing| {
                listing.status() == ListingStatus::Active && listing.is_past_expiry(now)
            })
            .map(|listing| listing.id)
            .collect();

        let request = TransitionRequest::expiry_check();
        let mut report = SweepReport::default();
        for id in due {
            match self.apply_transition(&id, &request, now) {
                Ok(_) => report.expired.push(id),
                Err(
                    ListingServiceError::Lifecycle(LifecycleError::InvalidTransition { .. })
                    | ListingServiceError::ConcurrentModification { .. }
                    | ListingServiceError::NotFound(_),
                ) => report.skipped.push(id),
                Err(other) => return Err(other),
            }
        }

        if !report.expired.is_empty() {
            info!(expired = report.expired.len(), skipped = report.skipped.len(), "expiry sweep finished");
        }
        Ok(report)
    }

    /// Public marketplace feed for the given query parameters.
    pub fn feed(
        &self,
        params: FeedParams,
        now: DateTime<Utc>,
    ) -> Result<Vec<Listing>, ListingServiceError> {
        let query = ListingQuery::from_params(params, &self.categories, &self.hierarchy)?;
        let listings = self.repository.list()?;
        Ok(query.run(listings, &AudienceContext::PublicFeed, now))
    }

    /// Public detail view; counts the visit.
    pub fn view(&self, id: &ListingId, now: DateTime<Utc>) -> Result<Listing, ListingServiceError> {
        let listing = self.get(id)?;
        if !is_eligible(&listing, &AudienceContext::PublicFeed) || !is_active_only(&listing, now) {
            return Err(ListingServiceError::NotFound(id.clone()));
        }
        match self.repository.record_view(id) {
            Ok(counted) => Ok(counted),
            Err(RepositoryError::NotFound) => Err(ListingServiceError::NotFound(id.clone())),
            Err(other) => Err(other.into()),
        }
    }

    pub fn dashboard(
        &self,
        owner: UserId,
        filter: DashboardFilter,
    ) -> Result<DashboardPartition, ListingServiceError> {
        let mut listings: Vec<Listing> = self
            .repository
            .by_owner(owner)?
            .into_iter()
            .filter(|listing| filter.status.map_or(true, |status| listing.status() == status))
            .filter(|listing| {
                filter
                    .visibility
                    .map_or(true, |visibility| listing.visibility() == visibility)
            })
            .collect();
        listings.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| a.id.cmp(&b.id)));
        Ok(partition_dashboard(owner, listings))
    }

    pub fn moderation_queue(
        &self,
        include_all: bool,
        page: usize,
        per_page: Option<usize>,
    ) -> Result<Page<Listing>, ListingServiceError> {
        let request = PageRequest::new(page, per_page.unwrap_or(self.queue_page_size));
        let listings = self.repository.list()?;
        Ok(moderation_queue(listings, include_all, request))
    }

    /// Flip public/private. Owner only; status is untouched.
    pub fn toggle_visibility(
        &self,
        id: &ListingId,
        owner: UserId,
        now: DateTime<Utc>,
    ) -> Result<Listing, ListingServiceError> {
        self.update_visibility(id, owner, now, Visibility::toggled)
    }

    /// Soft delete: the listing goes private and keeps its status.
    pub fn withdraw(
        &self,
        id: &ListingId,
        owner: UserId,
        now: DateTime<Utc>,
    ) -> Result<Listing, ListingServiceError> {
        self.update_visibility(id, owner, now, |_| Visibility::Private)
    }

    /// Feature or un-feature a listing. Moderators only.
    pub fn set_featured(
        &self,
        id: &ListingId,
        actor: Actor,
        featured: bool,
        now: DateTime<Utc>,
    ) -> Result<Listing, ListingServiceError> {
        if !matches!(actor, Actor::Moderator(_)) {
            return Err(ListingServiceError::Forbidden {
                action: "feature listings",
            });
        }

        self.modify(id, |listing| {
            if listing.is_featured != featured {
                listing.is_featured = featured;
                listing.updated_at = now;
            }
            Ok(())
        })
    }

    fn update_visibility(
        &self,
        id: &ListingId,
        owner: UserId,
        now: DateTime<Utc>,
        next: impl Fn(Visibility) -> Visibility,
    ) -> Result<Listing, ListingServiceError> {
        self.modify(id, |listing| {
            if listing.owner != owner {
                return Err(ListingServiceError::NotOwner {
                    listing: listing.id.clone(),
                    user: owner,
                });
            }
            let visibility = next(listing.visibility());
            listing.set_visibility(visibility, now);
            Ok(())
        })
    }

    fn modify(
        &self,
        id: &ListingId,
        edit: impl Fn(&mut Listing) -> Result<(), ListingServiceError>,
    ) -> Result<Listing, ListingServiceError> {
        for _ in 0..self.max_attempts {
            let mut listing = self.get(id)?;
            let observed = Observed::of(&listing);
            edit(&mut listing)?;
            match self.repository.compare_and_swap(observed, listing) {
                Ok(stored) => return Ok(stored),
                Err(err) if err.is_stale() => continue,
                Err(RepositoryError::NotFound) => {
                    return Err(ListingServiceError::NotFound(id.clone()))
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(ListingServiceError::ConcurrentModification {
            listing: id.clone(),
            attempts: self.max_attempts,
        })
    }
}

/// Error raised by the listing service.
#[derive(Debug, thiserror::Error)]
pub enum ListingServiceError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Validation(#[from] ListingValidation),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("listing {0} not found")]
    NotFound(ListingId),
    #[error("user {user:?} does not own listing {listing}")]
    NotOwner { listing: ListingId, user: UserId },
    #[error("only moderators may {action}")]
    Forbidden { action: &'static str },
    #[error("listing {listing} kept changing after {attempts} attempt(s); retry")]
    ConcurrentModification { listing: ListingId, attempts: u32 },
}

impl ListingServiceError {
    /// Whether the caller should re-read and try again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ListingServiceError::ConcurrentModification { .. } => true,
            ListingServiceError::Repository(err) => err.is_stale(),
            _ => false,
        }
    }
}
