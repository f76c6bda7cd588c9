use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::alerts::{
    AlertCategoryId, AlertDraft, AlertQuery, AlertRepository, AlertService, AlertServiceError,
    ScopeKind,
};
use super::geography::{GeographyError, MunicipalityId};
use super::listings::{
    Actor, ActorRole, DashboardFilter, FeedParams, LifecycleError, ListingDraft, ListingId,
    ListingRepository, ListingService, ListingServiceError, ListingStatus, RepositoryError,
    TransitionRequest, UserId,
};

/// Shared handler state: one listing service and one alert service.
pub struct MarketplaceState<R, A> {
    pub listings: Arc<ListingService<R>>,
    pub alerts: Arc<AlertService<A>>,
}

impl<R, A> Clone for MarketplaceState<R, A> {
    fn clone(&self) -> Self {
        Self {
            listings: Arc::clone(&self.listings),
            alerts: Arc::clone(&self.alerts),
        }
    }
}

/// Router builder exposing the marketplace endpoints.
pub fn marketplace_router<R, A>(
    listings: Arc<ListingService<R>>,
    alerts: Arc<AlertService<A>>,
) -> Router
where
    R: ListingRepository + 'static,
    A: AlertRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/listings",
            get(feed_handler::<R, A>).post(create_handler::<R, A>),
        )
        .route("/api/v1/listings/:listing_id", get(view_handler::<R, A>))
        .route(
            "/api/v1/listings/:listing_id/transitions",
            post(transition_handler::<R, A>),
        )
        .route(
            "/api/v1/listings/:listing_id/visibility",
            post(visibility_handler::<R, A>),
        )
        .route(
            "/api/v1/listings/:listing_id/featured",
            post(featured_handler::<R, A>),
        )
        .route(
            "/api/v1/owners/:owner_id/listings",
            get(dashboard_handler::<R, A>),
        )
        .route("/api/v1/moderation/queue", get(queue_handler::<R, A>))
        .route(
            "/api/v1/alerts",
            get(alert_feed_handler::<R, A>).post(publish_alert_handler::<R, A>),
        )
        .with_state(MarketplaceState { listings, alerts })
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateListingBody {
    pub(crate) owner: UserId,
    pub(crate) listing: ListingDraft,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionBody {
    pub(crate) status: ListingStatus,
    pub(crate) actor_role: ActorRole,
    pub(crate) actor_id: UserId,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VisibilityBody {
    pub(crate) owner: UserId,
    #[serde(default)]
    pub(crate) withdraw: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeaturedBody {
    pub(crate) actor_role: ActorRole,
    pub(crate) actor_id: UserId,
    pub(crate) featured: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QueueParams {
    #[serde(default)]
    pub(crate) all: bool,
    #[serde(default)]
    pub(crate) page: Option<usize>,
    #[serde(default)]
    pub(crate) per_page: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AlertFeedParams {
    #[serde(default)]
    pub(crate) municipality: Option<MunicipalityId>,
    #[serde(default)]
    pub(crate) category: Option<AlertCategoryId>,
    #[serde(default)]
    pub(crate) scope: Option<ScopeKind>,
    #[serde(default, alias = "q")]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) ordering: Option<String>,
}

impl AlertFeedParams {
    fn query(&self) -> AlertQuery {
        AlertQuery {
            category: self.category,
            scope: self.scope,
            search: self.search.clone(),
            ordering: self.ordering.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PublishAlertBody {
    pub(crate) actor_role: ActorRole,
    pub(crate) actor_id: UserId,
    pub(crate) alert: AlertDraft,
}

/// Only owners and moderators act over HTTP; the system role belongs to scheduled jobs.
fn request_actor(role: ActorRole, id: UserId) -> Option<Actor> {
    match role {
        ActorRole::Owner => Some(Actor::Owner(id)),
        ActorRole::Moderator => Some(Actor::Moderator(id)),
        ActorRole::System => None,
    }
}

fn error_body(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

impl IntoResponse for ListingServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ListingServiceError::Lifecycle(LifecycleError::InvalidTransition { .. }) => {
                StatusCode::CONFLICT
            }
            ListingServiceError::Lifecycle(LifecycleError::NotOwner { .. })
            | ListingServiceError::NotOwner { .. }
            | ListingServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ListingServiceError::Lifecycle(LifecycleError::MissingReviewContext { .. })
            | ListingServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ListingServiceError::Filter(_) => StatusCode::BAD_REQUEST,
            ListingServiceError::NotFound(_)
            | ListingServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            ListingServiceError::ConcurrentModification { .. }
            | ListingServiceError::Repository(RepositoryError::Conflict)
            | ListingServiceError::Repository(RepositoryError::StaleStatus { .. })
            | ListingServiceError::Repository(RepositoryError::StaleVersion { .. }) => {
                StatusCode::CONFLICT
            }
            ListingServiceError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let retryable = self.is_retryable();
        let body = json!({ "error": self.to_string(), "retryable": retryable });
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for AlertServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            AlertServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AlertServiceError::Filter(_) => StatusCode::BAD_REQUEST,
            AlertServiceError::Geography(GeographyError::UnknownDepartment(_))
            | AlertServiceError::Geography(GeographyError::UnknownMunicipality(_))
            | AlertServiceError::NotFound(_)
            | AlertServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            AlertServiceError::Forbidden => StatusCode::FORBIDDEN,
            AlertServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            AlertServiceError::Geography(_) | AlertServiceError::Repository(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_body(status, self.to_string())
    }
}

pub(crate) async fn create_handler<R, A>(
    State(state): State<MarketplaceState<R, A>>,
    Json(body): Json<CreateListingBody>,
) -> Response
where
    R: ListingRepository + 'static,
    A: AlertRepository + 'static,
{
    match state.listings.create(body.owner, body.listing, Utc::now()) {
        Ok(listing) => (StatusCode::CREATED, Json(listing)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn feed_handler<R, A>(
    State(state): State<MarketplaceState<R, A>>,
    Query(params): Query<FeedParams>,
) -> Response
where
    R: ListingRepository + 'static,
    A: AlertRepository + 'static,
{
    match state.listings.feed(params, Utc::now()) {
        Ok(listings) => (StatusCode::OK, Json(listings)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn view_handler<R, A>(
    State(state): State<MarketplaceState<R, A>>,
    Path(listing_id): Path<String>,
) -> Response
where
    R: ListingRepository + 'static,
    A: AlertRepository + 'static,
{
    match state.listings.view(&ListingId(listing_id), Utc::now()) {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn transition_handler<R, A>(
    State(state): State<MarketplaceState<R, A>>,
    Path(listing_id): Path<String>,
    Json(body): Json<TransitionBody>,
) -> Response
where
    R: ListingRepository + 'static,
    A: AlertRepository + 'static,
{
    let Some(actor) = request_actor(body.actor_role, body.actor_id) else {
        return error_body(
            StatusCode::FORBIDDEN,
            "system transitions cannot be requested over HTTP".to_string(),
        );
    };

    let request = TransitionRequest {
        target: body.status,
        actor,
        notes: body.notes,
    };
    match state
        .listings
        .apply_transition(&ListingId(listing_id), &request, Utc::now())
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn visibility_handler<R, A>(
    State(state): State<MarketplaceState<R, A>>,
    Path(listing_id): Path<String>,
    Json(body): Json<VisibilityBody>,
) -> Response
where
    R: ListingRepository + 'static,
    A: AlertRepository + 'static,
{
    let id = ListingId(listing_id);
    let result = if body.withdraw {
        state.listings.withdraw(&id, body.owner, Utc::now())
    } else {
        state.listings.toggle_visibility(&id, body.owner, Utc::now())
    };
    match result {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Moderation update of the featured flag.
pub(crate) async fn featured_handler<R, A>(
    State(state): State<MarketplaceState<R, A>>,
    Path(listing_id): Path<String>,
    Json(body): Json<FeaturedBody>,
) -> Response
where
    R: ListingRepository + 'static,
    A: AlertRepository + 'static,
{
    let Some(actor) = request_actor(body.actor_role, body.actor_id) else {
        return ListingServiceError::Forbidden {
            action: "feature listings",
        }
        .into_response();
    };

    match state
        .listings
        .set_featured(&ListingId(listing_id), actor, body.featured, Utc::now())
    {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn dashboard_handler<R, A>(
    State(state): State<MarketplaceState<R, A>>,
    Path(owner_id): Path<u64>,
    Query(filter): Query<DashboardFilter>,
) -> Response
where
    R: ListingRepository + 'static,
    A: AlertRepository + 'static,
{
    match state.listings.dashboard(UserId(owner_id), filter) {
        Ok(partition) => (StatusCode::OK, Json(partition)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn queue_handler<R, A>(
    State(state): State<MarketplaceState<R, A>>,
    Query(params): Query<QueueParams>,
) -> Response
where
    R: ListingRepository + 'static,
    A: AlertRepository + 'static,
{
    match state.listings.moderation_queue(
        params.all,
        params.page.unwrap_or(1),
        params.per_page,
    ) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn alert_feed_handler<R, A>(
    State(state): State<MarketplaceState<R, A>>,
    Query(params): Query<AlertFeedParams>,
) -> Response
where
    R: ListingRepository + 'static,
    A: AlertRepository + 'static,
{
    match state.alerts.feed(params.municipality, &params.query()) {
        Ok(feed) => (StatusCode::OK, Json(feed)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn publish_alert_handler<R, A>(
    State(state): State<MarketplaceState<R, A>>,
    Json(body): Json<PublishAlertBody>,
) -> Response
where
    R: ListingRepository + 'static,
    A: AlertRepository + 'static,
{
    let Some(actor) = request_actor(body.actor_role, body.actor_id) else {
        return AlertServiceError::Forbidden.into_response();
    };

    match state.alerts.publish(actor, body.alert, Utc::now()) {
        Ok(alert) => (StatusCode::CREATED, Json(alert)).into_response(),
        Err(err) => err.into_response(),
    }
}
