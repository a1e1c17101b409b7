//! Stock mutation engine.
//!
//! Every mutating call appends exactly one record to the movement ledger.
//! The store writes the record as part of the mutation, so either both the
//! parcel change and the record persist or neither does.

use common::{Clock, ParcelId, SystemClock, UserId};
use ledger::{Ledger, MovementKind, MovementRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::store::Journal;
use crate::{InventoryError, NewParcel, Parcel, ParcelPatch, ParcelStore, Result, parcel};

/// A requested quantity change for `add` or `reduce`.
///
/// Both amounts are magnitudes; the direction comes from the operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockChange {
    pub parcel_id: ParcelId,
    pub stones: i64,
    pub carat: Decimal,
    pub comment: Option<String>,
    pub actor: UserId,
}

impl StockChange {
    pub fn new(parcel_id: impl Into<ParcelId>, actor: UserId) -> Self {
        Self {
            parcel_id: parcel_id.into(),
            stones: 0,
            carat: Decimal::ZERO,
            comment: None,
            actor,
        }
    }

    pub fn stones(mut self, stones: i64) -> Self {
        self.stones = stones;
        self
    }

    pub fn carat(mut self, carat: Decimal) -> Self {
        self.carat = carat;
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if self.stones < 0 {
            return Err(InventoryError::validation(format!(
                "stone delta must not be negative (got {})",
                self.stones
            )));
        }
        parcel::carat("carat delta", self.carat)?;
        Ok(())
    }
}

/// The parcel after a mutation, with the ledger record it produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationResult {
    pub parcel: Parcel,
    pub record: MovementRecord,
}

/// Applies stock changes and records them in the movement ledger.
pub struct StockService<P, L, C = SystemClock>
where
    P: ParcelStore,
    L: Ledger,
    C: Clock,
{
    parcels: P,
    ledger: L,
    clock: C,
}

impl<P: ParcelStore, L: Ledger> StockService<P, L> {
    pub fn new(parcels: P, ledger: L) -> Self {
        Self::with_clock(parcels, ledger, SystemClock)
    }
}

impl<P: ParcelStore, L: Ledger, C: Clock> StockService<P, L, C> {
    /// Creates a service that timestamps ledger records with `clock`.
    pub fn with_clock(parcels: P, ledger: L, clock: C) -> Self {
        Self {
            parcels,
            ledger,
            clock,
        }
    }

    pub fn parcels(&self) -> &P {
        &self.parcels
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    fn journal(
        &self,
        kind: MovementKind,
        comment: Option<String>,
        actor: UserId,
    ) -> Journal<'_> {
        Journal {
            ledger: &self.ledger,
            kind,
            comment,
            actor,
            timestamp: self.clock.now(),
        }
    }

    fn recorded(&self, record: &MovementRecord) {
        metrics::counter!("stock_mutations_total", "kind" => record.kind.as_str()).increment(1);
        tracing::info!(
            parcel_id = %record.parcel_id,
            kind = %record.kind,
            stones_delta = record.stones_delta,
            carat_delta = %record.ct_weight_delta,
            "stock movement recorded"
        );
    }

    /// Adds stones and carat weight to a parcel.
    #[tracing::instrument(skip(self), fields(parcel_id = %change.parcel_id))]
    pub async fn add(&self, change: StockChange) -> Result<MutationResult> {
        change.validate()?;

        let journal = self.journal(MovementKind::Add, change.comment, change.actor);
        let result = self
            .parcels
            .adjust_quantities(&change.parcel_id, change.stones, change.carat, journal)
            .await?;

        self.recorded(&result.record);
        Ok(result)
    }

    /// Removes stones and carat weight from a parcel, clamping at zero.
    ///
    /// The ledger record carries the amount actually removed.
    #[tracing::instrument(skip(self), fields(parcel_id = %change.parcel_id))]
    pub async fn reduce(&self, change: StockChange) -> Result<MutationResult> {
        change.validate()?;

        let journal = self.journal(MovementKind::Reduce, change.comment, change.actor);
        let result = self
            .parcels
            .adjust_quantities(&change.parcel_id, -change.stones, -change.carat, journal)
            .await?;
        if result.record.stones_delta != -change.stones
            || result.record.ct_weight_delta != -change.carat
        {
            tracing::warn!(
                requested_stones = change.stones,
                applied_stones = result.record.stones_delta,
                "reduction clamped at zero"
            );
        }

        self.recorded(&result.record);
        Ok(result)
    }

    /// Updates non-quantity fields of a parcel.
    ///
    /// A locked parcel (`is_editable = false`) only accepts a patch that
    /// toggles the lock itself.
    #[tracing::instrument(skip(self, patch))]
    pub async fn edit(
        &self,
        parcel_id: &ParcelId,
        patch: ParcelPatch,
        actor: UserId,
    ) -> Result<MutationResult> {
        let current = self.parcels.get_by_id(parcel_id).await?;
        if !current.is_editable && !patch.only_toggles_lock() {
            return Err(InventoryError::validation(format!(
                "parcel {parcel_id} is locked for editing"
            )));
        }

        let journal = self.journal(MovementKind::Edit, patch.comments.clone(), actor);
        let result = self.parcels.update(parcel_id, &patch, journal).await?;

        self.recorded(&result.record);
        Ok(result)
    }

    /// Creates a top-level parent parcel. No ledger record is written.
    #[tracing::instrument(skip(self, data))]
    pub async fn create_parcel(&self, data: NewParcel) -> Result<Parcel> {
        if let Some(parent) = data.parent_id() {
            return Err(InventoryError::validation(format!(
                "a top-level parcel cannot name a parent (got {parent})"
            )));
        }

        let parcel = self.parcels.create(data).await?;
        tracing::info!(parcel_id = %parcel.parcel_id, "parcel created");
        Ok(parcel)
    }

    /// Creates a sub-parcel under an existing parent.
    #[tracing::instrument(skip(self, data))]
    pub async fn create_subcategory(
        &self,
        parent_id: &ParcelId,
        data: NewParcel,
    ) -> Result<Parcel> {
        let data = NewParcel {
            parent_parcel_id: Some(parent_id.as_str().to_string()),
            ..data
        };

        let parcel = self.parcels.create(data).await?;
        tracing::info!(parcel_id = %parcel.parcel_id, parent_id = %parent_id, "sub-parcel created");
        Ok(parcel)
    }

    /// Removes a parcel and records its final snapshot.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, parcel_id: &ParcelId, actor: UserId) -> Result<MutationResult> {
        let journal = self.journal(MovementKind::Delete, None, actor);
        let result = self.parcels.delete(parcel_id, journal).await?;

        self.recorded(&result.record);
        Ok(result)
    }

    /// Returns the ledger entries for a parcel, oldest first.
    ///
    /// History stays readable after the parcel is deleted.
    #[tracing::instrument(skip(self))]
    pub async fn history(&self, parcel_id: &ParcelId) -> Result<Vec<MovementRecord>> {
        Ok(self.ledger.entries_for_parcel(parcel_id).await?)
    }
}
