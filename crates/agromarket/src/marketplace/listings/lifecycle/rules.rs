use super::super::domain::{ActorRole, ListingStatus};

/// Named edges of the listing state machine. Each one carries its own side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransitionKind {
    Approve,
    Reject,
    Republish,
    RequestResubmission,
    Reactivate,
    MarkSold,
    Pause,
    Expire,
}

/// Look up the edge `from -> to` for the given role, if the table permits it.
///
/// Same-state requests are handled by the engine before this lookup.
pub(crate) fn classify(
    from: ListingStatus,
    to: ListingStatus,
    role: ActorRole,
) -> Option<TransitionKind> {
    use ListingStatus::*;

    match role {
        ActorRole::Moderator => match (from, to) {
            (PendingReview, Active) => Some(TransitionKind::Approve),
            (Rejected, Active) => Some(TransitionKind::Republish),
            (Rejected, PendingReview) => Some(TransitionKind::RequestResubmission),
            (Expired | Paused | Sold, Active) => Some(TransitionKind::Reactivate),
            // Overrides: a moderator may always pause or reject.
            (_, Paused) => Some(TransitionKind::Pause),
            (_, Rejected) => Some(TransitionKind::Reject),
            _ => None,
        },
        ActorRole::Owner => match (from, to) {
            (Active, Sold) => Some(TransitionKind::MarkSold),
            (Active, Paused) => Some(TransitionKind::Pause),
            _ => None,
        },
        ActorRole::System => match (from, to) {
            (Active, Paused) => Some(TransitionKind::Pause),
            (Active, Expired) => Some(TransitionKind::Expire),
            _ => None,
        },
    }
}
