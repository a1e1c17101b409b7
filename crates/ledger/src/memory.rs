use std::sync::Arc;

use async_trait::async_trait;
use common::ParcelId;
use tokio::sync::RwLock;

use crate::{Ledger, LedgerError, LedgerQuery, MovementRecord, Result};

/// In-memory ledger implementation for testing and database-less runs.
///
/// Provides the same interface as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    records: Arc<RwLock<Vec<MovementRecord>>>,
}

impl InMemoryLedger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of records stored.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Returns a copy of every record in insertion order.
    pub async fn snapshot(&self) -> Vec<MovementRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn append(&self, record: MovementRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(LedgerError::DuplicateEntry(record.id));
        }

        tracing::debug!(
            parcel_id = %record.parcel_id,
            kind = %record.kind,
            "movement appended"
        );
        records.push(record);
        Ok(())
    }

    async fn entries_for_parcel(&self, parcel_id: &ParcelId) -> Result<Vec<MovementRecord>> {
        let records = self.records.read().await;
        let mut entries: Vec<_> = records
            .iter()
            .filter(|r| &r.parcel_id == parcel_id)
            .cloned()
            .collect();
        entries.sort_by_key(|r| r.timestamp);
        Ok(entries)
    }

    async fn query(&self, query: LedgerQuery) -> Result<Vec<MovementRecord>> {
        let records = self.records.read().await;
        let mut entries: Vec<_> = records
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();

        // Stable sort keeps insertion order for equal timestamps
        entries.sort_by_key(|r| r.timestamp);

        let offset = query.offset.unwrap_or(0);
        let entries = entries.into_iter().skip(offset);
        let entries: Vec<_> = match query.limit {
            Some(limit) => entries.take(limit).collect(),
            None => entries.collect(),
        };

        Ok(entries)
    }

    async fn count_for_parcel(&self, parcel_id: &ParcelId) -> Result<usize> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| &r.parcel_id == parcel_id).count())
    }
}
