//! Eligibility filter: which listings belong in which result set.
//!
//! Every consumer (public feed, owner dashboard, moderation queue) goes through `is_eligible`
//! so the visibility and status rules live in exactly one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Listing, ListingStatus, UserId};

/// Largest page a moderation queue request may ask for.
pub const MAX_PAGE_SIZE: usize = 100;

/// The audience a result set is being built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "audience", rename_all = "snake_case")]
pub enum AudienceContext {
    PublicFeed,
    OwnerDashboard { owner: UserId },
    ModerationQueue { include_all: bool },
}

pub fn is_eligible(listing: &Listing, context: &AudienceContext) -> bool {
    match context {
        AudienceContext::PublicFeed => {
            listing.is_public() && listing.status != ListingStatus::Rejected
        }
        AudienceContext::OwnerDashboard { owner } => listing.owner == *owner,
        AudienceContext::ModerationQueue { include_all } => {
            *include_all || listing.status == ListingStatus::PendingReview
        }
    }
}

/// Stricter feed predicate: active and not yet past its expiry.
///
/// Expiry is evaluated here at read time, so a listing whose expiry has passed drops out even
/// before the expiry sweep has stored the `expired` status.
pub fn is_active_only(listing: &Listing, now: DateTime<Utc>) -> bool {
    listing.status == ListingStatus::Active && !listing.is_past_expiry(now)
}

/// Owner dashboard grouping: unsold listings first, sold ones second.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardPartition {
    pub available: Vec<Listing>,
    pub sold: Vec<Listing>,
}

impl DashboardPartition {
    pub fn len(&self) -> usize {
        self.available.len() + self.sold.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty() && self.sold.is_empty()
    }
}

pub fn partition_dashboard<I>(owner: UserId, listings: I) -> DashboardPartition
where
    I: IntoIterator<Item = Listing>,
{
    let context = AudienceContext::OwnerDashboard { owner };
    let (sold, available): (Vec<_>, Vec<_>) = listings
        .into_iter()
        .filter(|listing| is_eligible(listing, &context))
        .partition(|listing| listing.status == ListingStatus::Sold);

    DashboardPartition { available, sold }
}

/// 1-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
}

impl PageRequest {
    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PAGE_SIZE),
        }
    }

    fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page * self.per_page < self.total
    }
}

/// Listings awaiting review (or every listing), oldest first.
pub fn moderation_queue<I>(listings: I, include_all: bool, request: PageRequest) -> Page<Listing>
where
    I: IntoIterator<Item = Listing>,
{
    let request = PageRequest::new(request.page, request.per_page);
    let context = AudienceContext::ModerationQueue { include_all };

    let mut queue: Vec<Listing> = listings
        .into_iter()
        .filter(|listing| is_eligible(listing, &context))
        .collect();
    queue.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let total = queue.len();
    let items = queue
        .into_iter()
        .skip(request.offset())
        .take(request.per_page)
        .collect();

    Page {
        items,
        page: request.page,
        per_page: request.per_page,
        total,
    }
}
