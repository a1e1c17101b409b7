use chrono::{DateTime, Utc};
use common::{ParcelId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::LedgerError;

/// Unique identifier for a movement record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementId(Uuid);

impl MovementId {
    /// Creates a new random movement ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a movement ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MovementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MovementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of change a movement record captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementKind {
    Add,
    Reduce,
    Edit,
    Delete,
}

impl MovementKind {
    /// Returns the name used in storage and filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Add => "Add",
            MovementKind::Reduce => "Reduce",
            MovementKind::Edit => "Edit",
            MovementKind::Delete => "Delete",
        }
    }

    /// Parses a stored kind name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Add" => Some(MovementKind::Add),
            "Reduce" => Some(MovementKind::Reduce),
            "Edit" => Some(MovementKind::Edit),
            "Delete" => Some(MovementKind::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single immutable entry in the stock ledger.
///
/// Deltas are signed: `Add` records carry positive deltas, `Reduce` records
/// carry negative deltas equal to the amount actually removed, `Edit` and
/// `Delete` records carry zero deltas. The snapshot fields hold the parcel
/// quantities after the change was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub id: MovementId,
    pub parcel_id: ParcelId,
    pub kind: MovementKind,
    pub ct_weight_delta: Decimal,
    pub stones_delta: i64,
    pub total_carat: Decimal,
    pub number_of_stones: u32,
    pub comment: Option<String>,
    pub actor: UserId,
    pub timestamp: DateTime<Utc>,
}

impl MovementRecord {
    /// Creates a new movement record builder.
    pub fn builder() -> MovementRecordBuilder {
        MovementRecordBuilder::default()
    }

    /// Returns true if this record changed stock quantities.
    pub fn is_quantity_change(&self) -> bool {
        self.stones_delta != 0 || !self.ct_weight_delta.is_zero()
    }
}

/// Builder for constructing movement records.
#[derive(Debug, Default)]
pub struct MovementRecordBuilder {
    id: Option<MovementId>,
    parcel_id: Option<ParcelId>,
    kind: Option<MovementKind>,
    ct_weight_delta: Decimal,
    stones_delta: i64,
    total_carat: Option<Decimal>,
    number_of_stones: Option<u32>,
    comment: Option<String>,
    actor: Option<UserId>,
    timestamp: Option<DateTime<Utc>>,
}

impl MovementRecordBuilder {
    /// Sets the record ID. If not set, a new ID will be generated.
    pub fn id(mut self, id: MovementId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn parcel_id(mut self, parcel_id: ParcelId) -> Self {
        self.parcel_id = Some(parcel_id);
        self
    }

    pub fn kind(mut self, kind: MovementKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets the signed stone and carat deltas. Defaults to zero.
    pub fn deltas(mut self, stones_delta: i64, ct_weight_delta: Decimal) -> Self {
        self.stones_delta = stones_delta;
        self.ct_weight_delta = ct_weight_delta;
        self
    }

    /// Sets the quantities of the parcel after the change.
    pub fn snapshot(mut self, number_of_stones: u32, total_carat: Decimal) -> Self {
        self.number_of_stones = Some(number_of_stones);
        self.total_carat = Some(total_carat);
        self
    }

    /// Sets the free-text comment. Blank comments are dropped.
    pub fn comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self
    }

    pub fn actor(mut self, actor: UserId) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Sets the timestamp. If not set, the current time will be used.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Builds the record, failing if a required field is missing.
    pub fn build(self) -> Result<MovementRecord, LedgerError> {
        Ok(MovementRecord {
            id: self.id.unwrap_or_default(),
            parcel_id: self.parcel_id.ok_or(LedgerError::Incomplete("parcel_id"))?,
            kind: self.kind.ok_or(LedgerError::Incomplete("kind"))?,
            ct_weight_delta: self.ct_weight_delta,
            stones_delta: self.stones_delta,
            total_carat: self.total_carat.ok_or(LedgerError::Incomplete("total_carat"))?,
            number_of_stones: self
                .number_of_stones
                .ok_or(LedgerError::Incomplete("number_of_stones"))?,
            comment: self.comment,
            actor: self.actor.ok_or(LedgerError::Incomplete("actor"))?,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_defaults() {
        let record = MovementRecord::builder()
            .parcel_id(ParcelId::new("RB-1"))
            .kind(MovementKind::Edit)
            .snapshot(10, Decimal::new(50, 1))
            .actor(UserId::new("u-1"))
            .build()
            .unwrap();

        assert_eq!(record.stones_delta, 0);
        assert!(record.ct_weight_delta.is_zero());
        assert!(!record.is_quantity_change());
        assert!(record.comment.is_none());
    }

    #[test]
    fn builder_requires_actor() {
        let result = MovementRecord::builder()
            .parcel_id(ParcelId::new("RB-1"))
            .kind(MovementKind::Add)
            .snapshot(1, Decimal::ONE)
            .build();

        assert!(matches!(result, Err(LedgerError::Incomplete("actor"))));
    }

    #[test]
    fn blank_comment_is_dropped() {
        let record = MovementRecord::builder()
            .parcel_id(ParcelId::new("RB-1"))
            .kind(MovementKind::Reduce)
            .deltas(-3, Decimal::new(-10, 1))
            .snapshot(7, Decimal::new(40, 1))
            .comment(Some("   ".to_string()))
            .actor(UserId::new("u-1"))
            .build()
            .unwrap();

        assert!(record.comment.is_none());
        assert!(record.is_quantity_change());
    }

    #[test]
    fn kind_round_trips_through_storage_name() {
        for kind in [
            MovementKind::Add,
            MovementKind::Reduce,
            MovementKind::Edit,
            MovementKind::Delete,
        ] {
            assert_eq!(MovementKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(MovementKind::parse("Transfer"), None);
    }
}
