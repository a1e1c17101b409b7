//! Usage highlighting and per-user settings endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;

use analytics::{Color, HighlightMode, HighlightingConfig};
use axum::Json;
use axum::extract::State;
use common::ParcelId;
use serde::Serialize;

use crate::error::ApiError;
use crate::identity::{MaybeUser, User};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HighlightingResponse {
    pub mode: HighlightMode,
    pub date_range_days: u32,
    /// One color per catalog parcel.
    pub colors: BTreeMap<ParcelId, Color>,
}

/// GET /highlighting: colors for every parcel under the caller's settings.
///
/// Anonymous callers get the default settings.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
) -> Result<Json<HighlightingResponse>, ApiError> {
    let config = match &user {
        Some(user) => state.analytics.load_settings(user).await?,
        None => state.analytics.default_settings(),
    };
    let colors = state
        .analytics
        .generate_complete_highlighting_data(&config)
        .await?;

    Ok(Json(HighlightingResponse {
        mode: config.mode,
        date_range_days: config.date_range_days,
        colors,
    }))
}

/// GET /settings/highlighting
#[tracing::instrument(skip(state))]
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    User(user): User,
) -> Result<Json<HighlightingConfig>, ApiError> {
    let config = state.analytics.load_settings(&user).await?;
    Ok(Json(config))
}

/// PUT /settings/highlighting: validate and replace the caller's settings.
#[tracing::instrument(skip(state, body))]
pub async fn put_settings(
    State(state): State<Arc<AppState>>,
    User(user): User,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<HighlightingConfig>, ApiError> {
    let config = HighlightingConfig::from_value(body)?;
    state.analytics.save_settings(&user, &config).await?;
    Ok(Json(config))
}
