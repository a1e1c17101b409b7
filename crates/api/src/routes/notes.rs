//! Order status notes and operator alerts.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use notes::{AlertSink, OperatorAlert, StatusNote};
use serde::Deserialize;

use crate::error::ApiError;
use crate::identity::MaybeUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusNoteRequest {
    pub status: String,
    #[serde(default)]
    pub note: String,
}

/// POST /orders/{id}/status-notes: write and verify a status note.
///
/// Responds only once the note is confirmed readable; a note that cannot be
/// confirmed yields 503 and an operator alert.
#[tracing::instrument(skip(state, user, req))]
pub async fn record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    user: MaybeUser,
    Json(req): Json<StatusNoteRequest>,
) -> Result<(StatusCode, Json<StatusNote>), ApiError> {
    let note = state
        .notes
        .record(&user.identity(), &id, &req.status, &req.note)
        .await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// GET /alerts: operator alerts, oldest first.
pub async fn alerts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<OperatorAlert>>, ApiError> {
    Ok(Json(state.alerts.alerts().await?))
}
