use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::ParcelId;
use sqlx::PgConnection;

use crate::{LedgerQuery, MovementRecord, Result};

/// Core trait for ledger implementations.
///
/// The ledger is append-only: records are written once and never updated or
/// deleted, so concurrent writers cannot lose each other's entries.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Appends a record.
    ///
    /// Fails with `DuplicateEntry` if a record with the same ID exists.
    async fn append(&self, record: MovementRecord) -> Result<()>;

    /// Appends a record on a connection the caller holds.
    ///
    /// Database-backed ledgers write through `conn` so the record commits or
    /// rolls back with the caller's transaction. Other ledgers ignore it.
    async fn append_in(&self, _conn: &mut PgConnection, record: MovementRecord) -> Result<()> {
        self.append(record).await
    }

    /// Retrieves all records for a parcel, oldest first.
    async fn entries_for_parcel(&self, parcel_id: &ParcelId) -> Result<Vec<MovementRecord>>;

    /// Retrieves records matching a query, ordered by timestamp.
    async fn query(&self, query: LedgerQuery) -> Result<Vec<MovementRecord>>;

    /// Counts the records for a parcel.
    async fn count_for_parcel(&self, parcel_id: &ParcelId) -> Result<usize>;
}

#[async_trait]
impl<T: Ledger + ?Sized> Ledger for Arc<T> {
    async fn append(&self, record: MovementRecord) -> Result<()> {
        (**self).append(record).await
    }

    async fn append_in(&self, conn: &mut PgConnection, record: MovementRecord) -> Result<()> {
        (**self).append_in(conn, record).await
    }

    async fn entries_for_parcel(&self, parcel_id: &ParcelId) -> Result<Vec<MovementRecord>> {
        (**self).entries_for_parcel(parcel_id).await
    }

    async fn query(&self, query: LedgerQuery) -> Result<Vec<MovementRecord>> {
        (**self).query(query).await
    }

    async fn count_for_parcel(&self, parcel_id: &ParcelId) -> Result<usize> {
        (**self).count_for_parcel(parcel_id).await
    }
}

/// Extension trait providing convenience methods for ledgers.
#[async_trait]
pub trait LedgerExt: Ledger {
    /// Retrieves every record at or after `from`.
    async fn entries_since(&self, from: DateTime<Utc>) -> Result<Vec<MovementRecord>> {
        self.query(LedgerQuery::since(from)).await
    }

    /// Returns the most recent record for a parcel, if any.
    async fn latest_for_parcel(&self, parcel_id: &ParcelId) -> Result<Option<MovementRecord>> {
        Ok(self.entries_for_parcel(parcel_id).await?.pop())
    }
}

// Blanket implementation for all Ledger implementations
impl<T: Ledger + ?Sized> LedgerExt for T {}
