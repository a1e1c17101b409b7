//! Diamond parcel inventory.
//!
//! This crate provides:
//! - [`Parcel`] with its depth-1 parent/child hierarchy ([`ParcelKind`])
//! - [`ParcelStore`] persistence trait with in-memory and PostgreSQL backends
//! - [`StockService`], which applies quantity changes and appends one ledger
//!   record per mutation

pub mod engine;
pub mod error;
pub mod memory;
pub mod parcel;
pub mod postgres;
pub mod search;
pub mod store;
#[cfg(test)]
mod testing;

pub use engine::{MutationResult, StockChange, StockService};
pub use error::{InventoryError, Result};
pub use memory::InMemoryParcelStore;
pub use parcel::{NewParcel, Parcel, ParcelKind, ParcelPatch};
pub use postgres::PostgresParcelStore;
pub use search::{ParcelSearch, SortDirection, SortField};
pub use store::{Journal, ParcelStore};
