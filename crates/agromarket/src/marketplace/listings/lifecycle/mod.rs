//! Listing lifecycle engine.
//!
//! `LifecycleEngine::apply` is a pure function of the current listing snapshot, the requested
//! transition, and the current time. It never touches storage, so storage collaborators can
//! re-read and re-run it freely after an optimistic-concurrency conflict.

mod policy;
mod rules;

pub use policy::{ReviewNotesPolicy, TransitionWarning};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Actor, ActorRole, Listing, ListingId, ListingStatus, ReviewStamp, UserId};
use rules::{classify, TransitionKind};

/// Length of the fresh expiry window granted on reactivation.
pub const REACTIVATION_WINDOW_DAYS: i64 = 7;

pub fn reactivation_window() -> Duration {
    Duration::days(REACTIVATION_WINDOW_DAYS)
}

/// A requested move to `target`, made by `actor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub target: ListingStatus,
    pub actor: Actor,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TransitionRequest {
    pub fn new(target: ListingStatus, actor: Actor) -> Self {
        Self {
            target,
            actor,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Synthetic event issued by the expiry sweep.
    pub fn expiry_check() -> Self {
        Self::new(ListingStatus::Expired, Actor::System)
    }

    fn trimmed_notes(&self) -> Option<String> {
        self.notes
            .as_deref()
            .map(str::trim)
            .filter(|notes| !notes.is_empty())
            .map(str::to_string)
    }
}

/// Result of a successful `apply`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionOutcome {
    pub listing: Listing,
    pub previous: ListingStatus,
    /// False for idempotent same-state requests.
    pub changed: bool,
    pub warnings: Vec<TransitionWarning>,
}

impl TransitionOutcome {
    pub fn has_warning(&self, warning: TransitionWarning) -> bool {
        self.warnings.contains(&warning)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("{} may not move listing {listing} from {from} to {to}", .role.label())]
    InvalidTransition {
        listing: ListingId,
        from: ListingStatus,
        to: ListingStatus,
        role: ActorRole,
    },
    #[error("user {actor:?} does not own listing {listing}")]
    NotOwner { listing: ListingId, actor: UserId },
    #[error("rejecting listing {listing} requires review notes")]
    MissingReviewContext { listing: ListingId },
}

/// State machine over `ListingStatus` with the configured review-notes policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleEngine {
    review_notes: ReviewNotesPolicy,
}

impl LifecycleEngine {
    pub fn new(review_notes: ReviewNotesPolicy) -> Self {
        Self { review_notes }
    }

    pub fn review_notes_policy(&self) -> ReviewNotesPolicy {
        self.review_notes
    }

    /// Check whether `request` is permitted against `listing` without applying it.
    pub fn permits(&self, listing: &Listing, request: &TransitionRequest, now: DateTime<Utc>) -> bool {
        self.apply(listing, request, now).is_ok()
    }

    pub fn apply(
        &self,
        listing: &Listing,
        request: &TransitionRequest,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, LifecycleError> {
        if let Actor::Owner(user) = request.actor {
            if user != listing.owner {
                return Err(LifecycleError::NotOwner {
                    listing: listing.id.clone(),
                    actor: user,
                });
            }
        }

        let from = listing.status;
        let to = request.target;

        if from == to {
            return Ok(TransitionOutcome {
                listing: listing.clone(),
                previous: from,
                changed: false,
                warnings: Vec::new(),
            });
        }

        let invalid = || LifecycleError::InvalidTransition {
            listing: listing.id.clone(),
            from,
            to,
            role: request.actor.role(),
        };

        let kind = classify(from, to, request.actor.role()).ok_or_else(invalid)?;

        if kind == TransitionKind::Expire && !listing.is_past_expiry(now) {
            return Err(invalid());
        }

        let mut warnings = Vec::new();
        let notes = request.trimmed_notes();
        if kind == TransitionKind::Reject && notes.is_none() {
            match self.review_notes {
                ReviewNotesPolicy::Require => {
                    return Err(LifecycleError::MissingReviewContext {
                        listing: listing.id.clone(),
                    })
                }
                ReviewNotesPolicy::Warn => warnings.push(TransitionWarning::MissingReviewNotes),
            }
        }

        let mut next = listing.clone();
        next.status = to;
        next.updated_at = now;

        match kind {
            TransitionKind::Approve | TransitionKind::Republish => {
                next.published_at.get_or_insert(now);
                clear_review(&mut next);
            }
            TransitionKind::Reactivate => {
                next.published_at.get_or_insert(now);
                next.expires_at = Some(now + reactivation_window());
                clear_review(&mut next);
            }
            TransitionKind::Reject => {
                // Only moderators reach this edge, so the actor always carries a user id.
                if let Some(moderator) = request.actor.user() {
                    next.review = Some(ReviewStamp {
                        moderator,
                        reviewed_at: now,
                    });
                }
                next.review_notes = notes;
            }
            TransitionKind::RequestResubmission
            | TransitionKind::MarkSold
            | TransitionKind::Pause
            | TransitionKind::Expire => {}
        }

        Ok(TransitionOutcome {
            listing: next,
            previous: from,
            changed: true,
            warnings,
        })
    }
}

fn clear_review(listing: &mut Listing) {
    listing.review = None;
    listing.review_notes = None;
}
