//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use notes::AlertSink;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage: &'static str,
    /// Operator alerts on record; `None` if the alert store is unreachable.
    pub open_alerts: Option<usize>,
}

/// GET /health: liveness plus the active storage backend.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        storage: state.storage,
        open_alerts: state
            .alerts
            .count()
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "alert count unavailable"))
            .ok(),
    })
}
