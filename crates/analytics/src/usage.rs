//! Per-parcel usage over a time window.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::ParcelId;
use ledger::MovementRecord;
use serde::{Deserialize, Serialize};

/// Ledger activity for one parcel inside a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageAggregate {
    /// Number of ledger entries in the window.
    pub usage_count: u64,
    pub first_used: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

impl UsageAggregate {
    fn first(timestamp: DateTime<Utc>) -> Self {
        Self {
            usage_count: 1,
            first_used: timestamp,
            last_used: timestamp,
        }
    }

    fn record(&mut self, timestamp: DateTime<Utc>) {
        self.usage_count += 1;
        self.first_used = self.first_used.min(timestamp);
        self.last_used = self.last_used.max(timestamp);
    }
}

/// Groups ledger records by parcel, counting those at or after `since`.
///
/// Every record kind counts as usage. Input order does not matter.
pub fn aggregate_usage<'a>(
    records: impl IntoIterator<Item = &'a MovementRecord>,
    since: DateTime<Utc>,
) -> BTreeMap<ParcelId, UsageAggregate> {
    let mut usage: BTreeMap<ParcelId, UsageAggregate> = BTreeMap::new();

    for record in records.into_iter().filter(|r| r.timestamp >= since) {
        match usage.get_mut(&record.parcel_id) {
            Some(aggregate) => aggregate.record(record.timestamp),
            None => {
                usage.insert(
                    record.parcel_id.clone(),
                    UsageAggregate::first(record.timestamp),
                );
            }
        }
    }

    usage
}
