use chrono::{DateTime, Utc};
use common::ParcelId;

use crate::MovementKind;

/// Builder for constructing ledger queries.
///
/// Allows filtering movement records by parcel, kind and time range.
#[derive(Debug, Clone, Default)]
pub struct LedgerQuery {
    /// Filter by parcel ID.
    pub parcel_id: Option<ParcelId>,

    /// Filter by movement kinds (any of these kinds).
    pub kinds: Option<Vec<MovementKind>>,

    /// Filter by records at or after this timestamp.
    pub from_timestamp: Option<DateTime<Utc>>,

    /// Filter by records at or before this timestamp.
    pub to_timestamp: Option<DateTime<Utc>>,

    /// Maximum number of records to return.
    pub limit: Option<usize>,

    /// Number of records to skip.
    pub offset: Option<usize>,
}

impl LedgerQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for a specific parcel.
    pub fn for_parcel(parcel_id: ParcelId) -> Self {
        Self {
            parcel_id: Some(parcel_id),
            ..Default::default()
        }
    }

    /// Creates a query for every record at or after `from`.
    pub fn since(from: DateTime<Utc>) -> Self {
        Self {
            from_timestamp: Some(from),
            ..Default::default()
        }
    }

    pub fn parcel_id(mut self, parcel_id: ParcelId) -> Self {
        self.parcel_id = Some(parcel_id);
        self
    }

    /// Filters by a single movement kind.
    pub fn kind(mut self, kind: MovementKind) -> Self {
        self.kinds = Some(vec![kind]);
        self
    }

    /// Filters by multiple movement kinds (any of these).
    pub fn kinds(mut self, kinds: Vec<MovementKind>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    pub fn from_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.from_timestamp = Some(timestamp);
        self
    }

    pub fn to_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.to_timestamp = Some(timestamp);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the record satisfies every filter (paging excluded).
    pub fn matches(&self, record: &crate::MovementRecord) -> bool {
        if let Some(ref id) = self.parcel_id
            && &record.parcel_id != id
        {
            return false;
        }
        if let Some(ref kinds) = self.kinds
            && !kinds.contains(&record.kind)
        {
            return false;
        }
        if let Some(from) = self.from_timestamp
            && record.timestamp < from
        {
            return false;
        }
        if let Some(to) = self.to_timestamp
            && record.timestamp > to
        {
            return false;
        }
        true
    }
}
