use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::marketplace::categories::CategoryId;
use crate::marketplace::geography::{AdministrativeHierarchy, MunicipalityId, MunicipalityRef};

/// Upper bound on images attached to a single listing.
pub const MAX_IMAGES_PER_LISTING: usize = 10;

/// Identifier wrapper for marketplace listings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub String);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for sellers, buyers and moderators alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Closed set of lifecycle states. Exactly one applies to a listing at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    PendingReview,
    Active,
    Rejected,
    Paused,
    Sold,
    Expired,
}

impl ListingStatus {
    pub const ALL: [ListingStatus; 6] = [
        ListingStatus::PendingReview,
        ListingStatus::Active,
        ListingStatus::Rejected,
        ListingStatus::Paused,
        ListingStatus::Sold,
        ListingStatus::Expired,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ListingStatus::PendingReview => "pending_review",
            ListingStatus::Active => "active",
            ListingStatus::Rejected => "rejected",
            ListingStatus::Paused => "paused",
            ListingStatus::Sold => "sold",
            ListingStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid listing status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for ListingStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ListingStatus::ALL
            .into_iter()
            .find(|status| status.label() == s.trim())
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// Owner-controlled exposure of a listing, independent of its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub const fn label(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Visibility::Public => Visibility::Private,
            Visibility::Private => Visibility::Public,
        }
    }
}

/// Capability resolved once per request by the surrounding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Owner,
    Moderator,
    System,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::Owner => "owner",
            ActorRole::Moderator => "moderator",
            ActorRole::System => "system",
        }
    }
}

/// The party requesting a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Actor {
    Owner(UserId),
    Moderator(UserId),
    /// Scheduled jobs such as the expiry sweep.
    System,
}

impl Actor {
    pub const fn role(self) -> ActorRole {
        match self {
            Actor::Owner(_) => ActorRole::Owner,
            Actor::Moderator(_) => ActorRole::Moderator,
            Actor::System => ActorRole::System,
        }
    }

    pub const fn user(self) -> Option<UserId> {
        match self {
            Actor::Owner(id) | Actor::Moderator(id) => Some(id),
            Actor::System => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    #[serde(default)]
    pub alt_text: String,
}

/// Moderator and moment of the last review. Both are recorded or neither is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStamp {
    pub moderator: UserId,
    pub reviewed_at: DateTime<Utc>,
}

/// Owner supplied fields for a new listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<CategoryId>,
    pub price: Decimal,
    pub quantity: Decimal,
    pub unit_of_measure: String,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    /// Resolved to its department through the hierarchy at creation.
    #[serde(default)]
    pub municipality: Option<MunicipalityId>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListingValidation {
    #[error("listing title must not be empty")]
    EmptyTitle,
    #[error("price must be non-negative (found {0})")]
    NegativePrice(Decimal),
    #[error("quantity must be non-negative (found {0})")]
    NegativeQuantity(Decimal),
    #[error("too many images: {found} (maximum {max})")]
    TooManyImages { found: usize, max: usize },
    #[error("expiry must be in the future")]
    ExpiryInPast,
    #[error("unknown municipality {0:?}")]
    UnknownMunicipality(MunicipalityId),
}

/// A sellable unit in the marketplace.
///
/// Lifecycle fields are only writable through the lifecycle engine; everything else is plain
/// owner-managed data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    pub description: String,
    pub category: Option<CategoryId>,
    pub price: Decimal,
    pub quantity: Decimal,
    pub unit_of_measure: String,
    pub images: Vec<ImageRef>,
    pub owner: UserId,
    pub municipality: Option<MunicipalityRef>,
    pub is_featured: bool,
    pub view_count: u64,
    pub(crate) status: ListingStatus,
    pub(crate) visibility: Visibility,
    pub(crate) review: Option<ReviewStamp>,
    pub(crate) review_notes: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) published_at: Option<DateTime<Utc>>,
    pub(crate) expires_at: Option<DateTime<Utc>>,
    /// Bumped by the store on every successful swap.
    #[serde(default)]
    pub(crate) version: u64,
}

impl Listing {
    /// Build a new listing in `pending_review`. Nobody chooses the initial status, and the
    /// department always comes from `hierarchy`, never from the caller.
    pub fn create(
        id: ListingId,
        owner: UserId,
        draft: ListingDraft,
        hierarchy: &AdministrativeHierarchy,
        now: DateTime<Utc>,
    ) -> Result<Self, ListingValidation> {
        if draft.title.trim().is_empty() {
            return Err(ListingValidation::EmptyTitle);
        }
        if draft.price < Decimal::ZERO {
            return Err(ListingValidation::NegativePrice(draft.price));
        }
        if draft.quantity < Decimal::ZERO {
            return Err(ListingValidation::NegativeQuantity(draft.quantity));
        }
        if draft.images.len() > MAX_IMAGES_PER_LISTING {
            return Err(ListingValidation::TooManyImages {
                found: draft.images.len(),
                max: MAX_IMAGES_PER_LISTING,
            });
        }
        if matches!(draft.expires_at, Some(expiry) if expiry <= now) {
            return Err(ListingValidation::ExpiryInPast);
        }
        let municipality = draft
            .municipality
            .map(|id| {
                hierarchy
                    .resolve(id)
                    .map_err(|_| ListingValidation::UnknownMunicipality(id))
            })
            .transpose()?;

        Ok(Self {
            id,
            title: draft.title.trim().to_string(),
            description: draft.description,
            category: draft.category,
            price: draft.price,
            quantity: draft.quantity,
            unit_of_measure: draft.unit_of_measure,
            images: draft.images,
            owner,
            municipality,
            is_featured: false,
            view_count: 0,
            status: ListingStatus::PendingReview,
            visibility: draft.visibility,
            review: None,
            review_notes: None,
            created_at: now,
            updated_at: now,
            published_at: None,
            expires_at: draft.expires_at,
            version: 0,
        })
    }

    pub fn status(&self) -> ListingStatus {
        self.status
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn review(&self) -> Option<&ReviewStamp> {
        self.review.as_ref()
    }

    pub fn review_notes(&self) -> Option<&str> {
        self.review_notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    /// True once `now` has reached the stored expiry.
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expiry) if now >= expiry)
    }

    /// Visibility is owner data; the lifecycle engine never writes it.
    pub(crate) fn set_visibility(&mut self, visibility: Visibility, now: DateTime<Utc>) {
        if self.visibility != visibility {
            self.visibility = visibility;
            self.updated_at = now;
        }
    }
}
