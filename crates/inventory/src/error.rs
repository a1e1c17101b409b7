//! Inventory error types.

use common::ParcelId;
use ledger::LedgerError;
use thiserror::Error;

/// Errors that can occur during parcel and stock operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Missing or malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No parcel with this ID exists.
    #[error("Parcel not found: {0}")]
    NotFound(ParcelId),

    /// A parent parcel cannot be deleted while sub-parcels reference it.
    #[error("Parcel {parcel_id} still has {children} sub-parcel(s)")]
    HasChildren { parcel_id: ParcelId, children: usize },

    /// An error occurred in the movement ledger.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl InventoryError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        InventoryError::Validation(message.into())
    }
}

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;
