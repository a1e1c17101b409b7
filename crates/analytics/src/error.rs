//! Analytics error types.

use inventory::InventoryError;
use ledger::LedgerError;
use thiserror::Error;

/// Errors that can occur while computing usage or handling settings.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A highlighting configuration failed validation.
    #[error("Invalid highlighting config: {0}")]
    InvalidConfig(String),

    /// The parcel catalog could not be read.
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// The movement ledger could not be read.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failed to encode or decode a stored config.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AnalyticsError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        AnalyticsError::InvalidConfig(message.into())
    }
}

/// Result type for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
