use thiserror::Error;

use crate::MovementId;

/// Errors that can occur when interacting with the movement ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A record with this ID was already appended. Records are immutable.
    #[error("Movement record already exists: {0}")]
    DuplicateEntry(MovementId),

    /// A record could not be built because a required field was missing.
    #[error("Incomplete movement record: missing {0}")]
    Incomplete(&'static str),

    /// A stored row could not be mapped back into a record.
    #[error("Invalid ledger row: {0}")]
    InvalidRow(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
