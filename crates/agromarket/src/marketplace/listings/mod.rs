//! Marketplace listings: lifecycle, eligibility and query filters.

pub mod domain;
pub mod eligibility;
pub mod filters;
pub mod lifecycle;
pub mod repository;
pub mod service;

pub use domain::{
    Actor, ActorRole, ImageRef, Listing, ListingDraft, ListingId, ListingStatus, ListingValidation,
    ParseStatusError, ReviewStamp, UserId, Visibility, MAX_IMAGES_PER_LISTING,
};
pub use eligibility::{
    is_active_only, is_eligible, moderation_queue, partition_dashboard, AudienceContext,
    DashboardPartition, Page, PageRequest,
};
pub use filters::{
    matches_category, matches_search, matches_unit, FeedParams, ListingOrdering, ListingQuery,
    OrderField, SearchTerm,
};
pub use lifecycle::{
    LifecycleEngine, LifecycleError, ReviewNotesPolicy, TransitionOutcome, TransitionRequest,
    TransitionWarning, REACTIVATION_WINDOW_DAYS,
};
pub use repository::{ListingRepository, ListingSummary, Observed, RepositoryError};
pub use service::{DashboardFilter, ListingService, ListingServiceError, SweepReport};
