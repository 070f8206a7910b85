//! Liveness and readiness probes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tracing::warn;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
}

/// The process is up.
async fn health() -> &'static str {
    "ok"
}

/// The database answers queries.
async fn ready(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.db().health_check().await {
        (StatusCode::OK, "ok")
    } else {
        warn!("Readiness check failed: database unavailable");
        (StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
    }
}
