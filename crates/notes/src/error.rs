//! Status note error types.

use common::OrderId;
use thiserror::Error;

use crate::NoteId;

/// Errors that can occur while recording a status note.
#[derive(Debug, Error)]
pub enum NoteError {
    /// Malformed input. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No acting identity is available. Never retried.
    #[error("Not authorized: {0}")]
    Auth(String),

    /// Storage I/O failure or a note that is not yet visible.
    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Note not found: {0}")]
    NotFound(NoteId),

    /// The note may have been written but could not be confirmed.
    ///
    /// Nothing else retries on the caller's behalf, so this needs operator
    /// attention.
    #[error(
        "Status note {note_id} for order {order_id} could not be verified after {attempts} attempt(s): {last_error}"
    )]
    VerificationTimeout {
        order_id: OrderId,
        note_id: NoteId,
        attempts: u32,
        last_error: String,
    },
}

impl NoteError {
    pub(crate) fn transient(message: impl Into<String>) -> Self {
        NoteError::Transient(message.into())
    }
}

impl From<sqlx::Error> for NoteError {
    fn from(e: sqlx::Error) -> Self {
        NoteError::Transient(format!("database: {e}"))
    }
}

/// Result type for status note operations.
pub type Result<T> = std::result::Result<T, NoteError>;
