//! Health check HTTP surface: `/healthz` + `/readyz`, merged into the
//! notification API's own router rather than served from a dedicated
//! listener.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::timeout::TimeoutLayer;

use crate::HealthChecker;

/// Build the `/healthz` + `/readyz` router for merging into a larger app.
#[must_use]
pub fn health_router(health_checker: Arc<HealthChecker>) -> Router {
    Router::new()
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .with_state(health_checker)
        .layer(TimeoutLayer::new(Duration::from_secs(1)))
}

async fn liveness_handler(State(health_checker): State<Arc<HealthChecker>>) -> Response {
    if health_checker.is_alive() {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response()
    }
}

async fn readiness_handler(State(health_checker): State<Arc<HealthChecker>>) -> Response {
    if health_checker.is_ready() {
        (StatusCode::OK, "OK").into_response()
    } else {
        let status = health_checker.get_status();
        tracing::warn!(
            store_ready = status.store_ready,
            scheduler_ready = status.scheduler_ready,
            queue_depth = status.queue_depth,
            max_queue_depth = status.max_queue_depth,
            "readiness probe failed"
        );
        (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response()
    }
}
