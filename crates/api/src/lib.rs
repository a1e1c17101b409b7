//! HTTP API server for the diamond stock ledger.
//!
//! Exposes the parcel catalog, stock mutations, usage highlighting and
//! verified order status notes over REST, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/parcels",
            get(routes::parcels::search).post(routes::parcels::create),
        )
        .route(
            "/parcels/{id}",
            get(routes::parcels::get)
                .patch(routes::parcels::edit)
                .delete(routes::parcels::delete),
        )
        .route(
            "/parcels/{id}/subcategories",
            post(routes::parcels::create_subcategory),
        )
        .route("/parcels/{id}/add", post(routes::parcels::add))
        .route("/parcels/{id}/reduce", post(routes::parcels::reduce))
        .route("/parcels/{id}/movements", get(routes::parcels::movements))
        .route("/highlighting", get(routes::highlighting::get))
        .route(
            "/settings/highlighting",
            get(routes::highlighting::get_settings).put(routes::highlighting::put_settings),
        )
        .route("/orders/{id}/status-notes", post(routes::notes::record))
        .route("/alerts", get(routes::notes::alerts))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state backed by in-memory stores.
pub fn create_default_state() -> Arc<AppState> {
    Arc::new(AppState::in_memory(notes::WriterConfig::default()))
}
