//! API error types with HTTP response mapping.

use analytics::AnalyticsError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use inventory::InventoryError;
use notes::NoteError;
use serde_json::json;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// No acting user on the request.
    Unauthorized(String),
    /// Parcel or stock operation error.
    Inventory(InventoryError),
    /// Usage analytics or settings error.
    Analytics(AnalyticsError),
    /// Status note error.
    Notes(NoteError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            ApiError::Inventory(err) => {
                let status = inventory_status(&err);
                (status, error_body(status, &err))
            }
            ApiError::Analytics(err) => {
                let status = analytics_status(&err);
                (status, error_body(status, &err))
            }
            ApiError::Notes(err) => note_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
        };

        metrics::counter!("api_errors_total", "status" => status.as_u16().to_string()).increment(1);
        (status, axum::Json(body)).into_response()
    }
}

fn error_body(status: StatusCode, err: &dyn std::error::Error) -> serde_json::Value {
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    json!({ "error": err.to_string() })
}

fn inventory_status(err: &InventoryError) -> StatusCode {
    match err {
        InventoryError::Validation(_) => StatusCode::BAD_REQUEST,
        InventoryError::NotFound(_) => StatusCode::NOT_FOUND,
        InventoryError::HasChildren { .. } => StatusCode::CONFLICT,
        InventoryError::Ledger(_) | InventoryError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn analytics_status(err: &AnalyticsError) -> StatusCode {
    match err {
        AnalyticsError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        AnalyticsError::Inventory(inner) => inventory_status(inner),
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn note_error_to_response(err: NoteError) -> (StatusCode, serde_json::Value) {
    match &err {
        NoteError::Validation(_) => (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() })),
        NoteError::Auth(_) => (StatusCode::UNAUTHORIZED, json!({ "error": err.to_string() })),
        NoteError::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "error": err.to_string() })),
        NoteError::Transient(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "error": err.to_string() }),
        ),
        NoteError::VerificationTimeout {
            order_id,
            note_id,
            attempts,
            ..
        } => (
            StatusCode::SERVICE_UNAVAILABLE,
            json!({
                "error": err.to_string(),
                "order_id": order_id,
                "note_id": note_id,
                "attempts": attempts,
            }),
        ),
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        ApiError::Inventory(err)
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        ApiError::Analytics(err)
    }
}

impl From<NoteError> for ApiError {
    fn from(err: NoteError) -> Self {
        ApiError::Notes(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderId, ParcelId};
    use notes::NoteId;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_inventory_errors_map_to_client_statuses() {
        assert_eq!(
            status_of(InventoryError::Validation("bad".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(InventoryError::NotFound(ParcelId::new("RB-1")).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(
                InventoryError::HasChildren {
                    parcel_id: ParcelId::new("RB-1"),
                    children: 2,
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_note_errors_map_to_statuses() {
        assert_eq!(
            status_of(NoteError::Auth("no user".into()).into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(NoteError::Transient("reset".into()).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(
                NoteError::VerificationTimeout {
                    order_id: OrderId::new(),
                    note_id: NoteId::new(),
                    attempts: 3,
                    last_error: "not readable".into(),
                }
                .into()
            ),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_invalid_config_is_bad_request() {
        assert_eq!(
            status_of(AnalyticsError::InvalidConfig("bands overlap".into()).into()),
            StatusCode::BAD_REQUEST
        );
    }
}
