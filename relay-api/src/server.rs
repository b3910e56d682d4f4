//! HTTP server assembly: the notification API merged with the health
//! endpoints onto a single router and listener, rather than on separate
//! ports.

use std::{sync::Arc, time::Duration};

use axum::{
    routing::{get, post},
    Router,
};
use relay_common::Signal;
use relay_health::HealthChecker;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

use crate::{handlers, state::AppState};

#[must_use]
pub fn router(state: Arc<AppState>, health_checker: Arc<HealthChecker>) -> Router {
    let api = Router::new()
        .route("/notifications/send", post(handlers::notifications::send))
        .route(
            "/notifications/schedule",
            post(handlers::notifications::schedule),
        )
        .route(
            "/notifications/{tracking_id}/status",
            get(handlers::notifications::status),
        )
        .route(
            "/notifications/batch",
            post(handlers::notifications::batch),
        )
        .route(
            "/templates",
            post(handlers::templates::create).get(handlers::templates::list),
        )
        .route("/analytics/summary", get(handlers::analytics::summary))
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    api.merge(relay_health::health_router(health_checker))
}

/// Bind `address` and serve `app` until `shutdown` fires.
///
/// # Errors
///
/// Returns an error if binding or serving fails.
pub async fn serve(
    app: Router,
    address: &str,
    mut shutdown: tokio::sync::broadcast::Receiver<Signal>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(address).await?;
    tracing::info!(%address, "notification api server bound");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("notification api server received shutdown signal");
        })
        .await?;

    tracing::info!("notification api server stopped");
    Ok(())
}
