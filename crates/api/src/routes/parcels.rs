//! Parcel catalog and stock mutation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::ParcelId;
use inventory::{
    MutationResult, NewParcel, Parcel, ParcelPatch, ParcelSearch, ParcelStore, StockChange,
};
use ledger::MovementRecord;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ApiError;
use crate::identity::User;
use crate::state::AppState;

/// Body for `add` and `reduce`. Both amounts are magnitudes.
#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    #[serde(default)]
    pub stones: i64,
    #[serde(default)]
    pub carat: Decimal,
    pub comment: Option<String>,
}

impl QuantityRequest {
    fn into_change(self, parcel_id: String, User(actor): User) -> StockChange {
        let change = StockChange::new(parcel_id, actor)
            .stones(self.stones)
            .carat(self.carat);
        match self.comment {
            Some(comment) => change.comment(comment),
            None => change,
        }
    }
}

/// GET /parcels: search the catalog.
#[tracing::instrument(skip(state))]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(criteria): Query<ParcelSearch>,
) -> Result<Json<Vec<Parcel>>, ApiError> {
    let parcels = state.stock.parcels().search(&criteria).await?;
    Ok(Json(parcels))
}

/// POST /parcels: create a top-level parcel.
#[tracing::instrument(skip(state, data))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(data): Json<NewParcel>,
) -> Result<(StatusCode, Json<Parcel>), ApiError> {
    let parcel = state.stock.create_parcel(data).await?;
    Ok((StatusCode::CREATED, Json(parcel)))
}

/// GET /parcels/{id}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Parcel>, ApiError> {
    let parcel = state.stock.parcels().get_by_id(&ParcelId::new(id)).await?;
    Ok(Json(parcel))
}

/// PATCH /parcels/{id}: edit non-quantity fields.
#[tracing::instrument(skip(state, patch))]
pub async fn edit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    User(actor): User,
    Json(patch): Json<ParcelPatch>,
) -> Result<Json<MutationResult>, ApiError> {
    let result = state.stock.edit(&ParcelId::new(id), patch, actor).await?;
    Ok(Json(result))
}

/// DELETE /parcels/{id}
#[tracing::instrument(skip(state))]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    User(actor): User,
) -> Result<Json<MutationResult>, ApiError> {
    let result = state.stock.delete(&ParcelId::new(id), actor).await?;
    Ok(Json(result))
}

/// POST /parcels/{id}/subcategories: create a sub-parcel under `id`.
#[tracing::instrument(skip(state, data))]
pub async fn create_subcategory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(data): Json<NewParcel>,
) -> Result<(StatusCode, Json<Parcel>), ApiError> {
    let parcel = state
        .stock
        .create_subcategory(&ParcelId::new(id), data)
        .await?;
    Ok((StatusCode::CREATED, Json(parcel)))
}

/// POST /parcels/{id}/add
#[tracing::instrument(skip(state, req))]
pub async fn add(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    user: User,
    Json(req): Json<QuantityRequest>,
) -> Result<Json<MutationResult>, ApiError> {
    let result = state.stock.add(req.into_change(id, user)).await?;
    Ok(Json(result))
}

/// POST /parcels/{id}/reduce: reductions clamp at zero.
#[tracing::instrument(skip(state, req))]
pub async fn reduce(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    user: User,
    Json(req): Json<QuantityRequest>,
) -> Result<Json<MutationResult>, ApiError> {
    let result = state.stock.reduce(req.into_change(id, user)).await?;
    Ok(Json(result))
}

/// GET /parcels/{id}/movements: ledger history, oldest first.
#[tracing::instrument(skip(state))]
pub async fn movements(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MovementRecord>>, ApiError> {
    let records = state.stock.history(&ParcelId::new(id)).await?;
    Ok(Json(records))
}
