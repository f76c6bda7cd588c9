use serde::Serialize;

use super::domain::{Listing, ListingId, ListingStatus, UserId};

/// Storage abstraction owned by the surrounding application.
///
/// Writes are conditioned on the status and version the caller last observed, so neither two
/// concurrent transitions nor a transition and an owner edit can both land on the same snapshot.
/// The view counter belongs to the store: swaps keep the stored count and `record_view` bumps it
/// in place.
pub trait ListingRepository: Send + Sync {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError>;
    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError>;
    /// Replace the stored listing only if it still matches `observed`; returns what was stored.
    fn compare_and_swap(&self, observed: Observed, listing: Listing)
        -> Result<Listing, RepositoryError>;
    /// Add one to the stored view counter without touching any other field.
    fn record_view(&self, id: &ListingId) -> Result<Listing, RepositoryError>;
    fn list(&self) -> Result<Vec<Listing>, RepositoryError>;
    fn by_owner(&self, owner: UserId) -> Result<Vec<Listing>, RepositoryError>;
}

/// Status and version a writer read before computing its change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observed {
    pub status: ListingStatus,
    pub version: u64,
}

impl Observed {
    pub fn of(listing: &Listing) -> Self {
        Self {
            status: listing.status(),
            version: listing.version(),
        }
    }

    /// Check a stored snapshot against what the writer saw. A status mismatch wins over a
    /// version mismatch so callers can tell a lifecycle race from an unrelated edit.
    pub fn verify(&self, stored: &Listing) -> Result<(), RepositoryError> {
        if stored.status() != self.status {
            return Err(RepositoryError::StaleStatus {
                expected: self.status,
                found: stored.status(),
            });
        }
        if stored.version() != self.version {
            return Err(RepositoryError::StaleVersion {
                expected: self.version,
                found: stored.version(),
            });
        }
        Ok(())
    }
}

impl Listing {
    /// The snapshot a store persists after a successful swap over `stored`.
    pub fn next_revision(mut self, stored: &Listing) -> Listing {
        self.version = stored.version() + 1;
        self.view_count = stored.view_count;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("stored status is {found}, expected {expected}")]
    StaleStatus {
        expected: ListingStatus,
        found: ListingStatus,
    },
    #[error("stored version is {found}, expected {expected}")]
    StaleVersion { expected: u64, found: u64 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// The record moved between read and write.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            RepositoryError::StaleStatus { .. } | RepositoryError::StaleVersion { .. }
        )
    }
}

/// Compact projection used by list endpoints and CLI output.
#[derive(Debug, Clone, Serialize)]
pub struct ListingSummary {
    pub id: ListingId,
    pub title: String,
    pub status: &'static str,
    pub visibility: &'static str,
    pub price: rust_decimal::Decimal,
    pub unit_of_measure: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_notes: Option<String>,
}

impl Listing {
    pub fn summary(&self) -> ListingSummary {
        ListingSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            status: self.status.label(),
            visibility: self.visibility.label(),
            price: self.price,
            unit_of_measure: self.unit_of_measure.clone(),
            review_notes: self.review_notes.clone(),
        }
    }
}
