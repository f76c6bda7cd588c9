use crate::infra::AppState;
use agromarket::marketplace::alerts::{AlertRepository, AlertService};
use agromarket::marketplace::listings::{ListingRepository, ListingService};
use agromarket::marketplace::marketplace_router;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_marketplace_routes<R, A>(
    listings: Arc<ListingService<R>>,
    alerts: Arc<AlertService<A>>,
) -> axum::Router
where
    R: ListingRepository + 'static,
    A: AlertRepository + 'static,
{
    marketplace_router(listings, alerts)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "agromarket" }))
}

/// Ready once reference data is loaded and the listener is bound.
pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    match state.readiness.load(std::sync::atomic::Ordering::Relaxed) {
        true => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        false => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "loading reference data" })),
        ),
    }
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
