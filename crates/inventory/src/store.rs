use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ParcelId, UserId};
use ledger::{Ledger, MovementKind, MovementRecord};
use rust_decimal::Decimal;

use crate::parcel::MAX_CARAT;
use crate::{InventoryError, MutationResult, NewParcel, Parcel, ParcelPatch, ParcelSearch, Result};

/// Ledger entry to write together with a store mutation.
///
/// The store appends the record before it makes the change visible, so a
/// failed append leaves the parcel untouched.
pub struct Journal<'a> {
    pub ledger: &'a dyn Ledger,
    pub kind: MovementKind,
    pub comment: Option<String>,
    pub actor: UserId,
    pub timestamp: DateTime<Utc>,
}

impl Journal<'_> {
    /// Builds the record describing `parcel` after the change.
    pub fn record_for(
        &self,
        parcel: &Parcel,
        stones_delta: i64,
        carat_delta: Decimal,
    ) -> Result<MovementRecord> {
        Ok(MovementRecord::builder()
            .parcel_id(parcel.parcel_id.clone())
            .kind(self.kind)
            .deltas(stones_delta, carat_delta)
            .snapshot(parcel.number_of_stones, parcel.total_carat)
            .comment(self.comment.clone())
            .actor(self.actor.clone())
            .timestamp(self.timestamp)
            .build()?)
    }
}

/// Persistence access for parcel records and their lineage.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait ParcelStore: Send + Sync {
    /// Returns every parcel, ordered by ID.
    async fn get_all(&self) -> Result<Vec<Parcel>>;

    /// Fails with `NotFound` if the ID is unknown.
    async fn get_by_id(&self, id: &ParcelId) -> Result<Parcel>;

    async fn search(&self, criteria: &ParcelSearch) -> Result<Vec<Parcel>>;

    /// Validates and stores a new parcel.
    ///
    /// If `parent_parcel_id` is set the parcel becomes a child; the parent
    /// must exist and must itself be a parent. Fails with `Validation` on
    /// missing fields, an unresolvable parent or a duplicate ID.
    async fn create(&self, data: NewParcel) -> Result<Parcel>;

    /// Applies a field patch and journals a zero-delta record.
    ///
    /// Fails with `NotFound` if the ID is unknown.
    async fn update(
        &self,
        id: &ParcelId,
        patch: &ParcelPatch,
        journal: Journal<'_>,
    ) -> Result<MutationResult>;

    /// Removes a parcel and journals its last state.
    ///
    /// Fails with `HasChildren` for a parent that still has sub-parcels.
    async fn delete(&self, id: &ParcelId, journal: Journal<'_>) -> Result<MutationResult>;

    /// Atomically adds signed deltas to the stone count and carat weight,
    /// clamping both at zero. The record carries the applied deltas, which
    /// can be smaller in magnitude than the requested ones.
    async fn adjust_quantities(
        &self,
        id: &ParcelId,
        stones_delta: i64,
        carat_delta: Decimal,
        journal: Journal<'_>,
    ) -> Result<MutationResult>;

    /// Returns the sub-parcels of a parent, ordered by ID.
    async fn children_of(&self, id: &ParcelId) -> Result<Vec<Parcel>>;

    /// Returns every known parcel ID, parents and children.
    async fn all_ids(&self) -> Result<Vec<ParcelId>>;
}

#[async_trait]
impl<T: ParcelStore + ?Sized> ParcelStore for Arc<T> {
    async fn get_all(&self) -> Result<Vec<Parcel>> {
        (**self).get_all().await
    }

    async fn get_by_id(&self, id: &ParcelId) -> Result<Parcel> {
        (**self).get_by_id(id).await
    }

    async fn search(&self, criteria: &ParcelSearch) -> Result<Vec<Parcel>> {
        (**self).search(criteria).await
    }

    async fn create(&self, data: NewParcel) -> Result<Parcel> {
        (**self).create(data).await
    }

    async fn update(
        &self,
        id: &ParcelId,
        patch: &ParcelPatch,
        journal: Journal<'_>,
    ) -> Result<MutationResult> {
        (**self).update(id, patch, journal).await
    }

    async fn delete(&self, id: &ParcelId, journal: Journal<'_>) -> Result<MutationResult> {
        (**self).delete(id, journal).await
    }

    async fn adjust_quantities(
        &self,
        id: &ParcelId,
        stones_delta: i64,
        carat_delta: Decimal,
        journal: Journal<'_>,
    ) -> Result<MutationResult> {
        (**self)
            .adjust_quantities(id, stones_delta, carat_delta, journal)
            .await
    }

    async fn children_of(&self, id: &ParcelId) -> Result<Vec<Parcel>> {
        (**self).children_of(id).await
    }

    async fn all_ids(&self) -> Result<Vec<ParcelId>> {
        (**self).all_ids().await
    }
}

/// Computes clamped quantities for an adjustment.
///
/// Returns `(new_stones, new_carat, applied_stones, applied_carat)`.
pub(crate) fn clamp_adjustment(
    stones: u32,
    carat: Decimal,
    stones_delta: i64,
    carat_delta: Decimal,
) -> Result<(u32, Decimal, i64, Decimal)> {
    let current_stones = i64::from(stones);
    let target_stones = current_stones.saturating_add(stones_delta).max(0);
    let new_stones = u32::try_from(target_stones).map_err(|_| {
        InventoryError::validation(format!(
            "number_of_stones would exceed {} (got {target_stones})",
            u32::MAX
        ))
    })?;

    let new_carat = carat
        .checked_add(carat_delta)
        .filter(|c| *c <= MAX_CARAT)
        .ok_or_else(|| {
            InventoryError::validation(format!(
                "total_carat would exceed {MAX_CARAT} ({carat} + {carat_delta})"
            ))
        })?
        .max(Decimal::ZERO);

    Ok((
        new_stones,
        new_carat,
        target_stones - current_stones,
        new_carat - carat,
    ))
}
