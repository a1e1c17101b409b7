use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::ParcelId;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::store::{Journal, clamp_adjustment};
use crate::{
    InventoryError, MutationResult, NewParcel, Parcel, ParcelKind, ParcelPatch, ParcelSearch,
    ParcelStore, Result,
};

/// In-memory parcel store for testing and database-less runs.
///
/// Every mutation runs under a single write lock and is computed on a copy.
/// The copy replaces the stored parcel only after the journal record has
/// been appended.
#[derive(Clone, Default)]
pub struct InMemoryParcelStore {
    parcels: Arc<RwLock<BTreeMap<ParcelId, Parcel>>>,
}

impl InMemoryParcelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of parcels stored.
    pub async fn len(&self) -> usize {
        self.parcels.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.parcels.read().await.is_empty()
    }
}

fn resolve_kind(parcels: &BTreeMap<ParcelId, Parcel>, data: &NewParcel) -> Result<ParcelKind> {
    let Some(parent_id) = data.parent_id() else {
        return Ok(ParcelKind::Parent);
    };

    match parcels.get(&parent_id) {
        Some(parent) if parent.is_parent() => Ok(ParcelKind::Child { parent_id }),
        Some(_) => Err(InventoryError::Validation(format!(
            "parent {parent_id} is itself a sub-parcel"
        ))),
        None => Err(InventoryError::Validation(format!(
            "parent {parent_id} does not exist"
        ))),
    }
}

#[async_trait]
impl ParcelStore for InMemoryParcelStore {
    async fn get_all(&self) -> Result<Vec<Parcel>> {
        Ok(self.parcels.read().await.values().cloned().collect())
    }

    async fn get_by_id(&self, id: &ParcelId) -> Result<Parcel> {
        self.parcels
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| InventoryError::NotFound(id.clone()))
    }

    async fn search(&self, criteria: &ParcelSearch) -> Result<Vec<Parcel>> {
        let parcels = self.parcels.read().await;
        Ok(criteria.apply(parcels.values().cloned()))
    }

    async fn create(&self, data: NewParcel) -> Result<Parcel> {
        let mut parcels = self.parcels.write().await;

        let kind = resolve_kind(&parcels, &data)?;
        let parcel = data.into_parcel(kind, Utc::now())?;
        if parcels.contains_key(&parcel.parcel_id) {
            return Err(InventoryError::Validation(format!(
                "parcel {} already exists",
                parcel.parcel_id
            )));
        }

        parcels.insert(parcel.parcel_id.clone(), parcel.clone());
        Ok(parcel)
    }

    async fn update(
        &self,
        id: &ParcelId,
        patch: &ParcelPatch,
        journal: Journal<'_>,
    ) -> Result<MutationResult> {
        let mut parcels = self.parcels.write().await;
        let parcel = parcels
            .get_mut(id)
            .ok_or_else(|| InventoryError::NotFound(id.clone()))?;

        let mut updated = parcel.clone();
        patch.apply(&mut updated, Utc::now())?;
        let record = journal.record_for(&updated, 0, Decimal::ZERO)?;
        journal.ledger.append(record.clone()).await?;

        *parcel = updated.clone();
        Ok(MutationResult {
            parcel: updated,
            record,
        })
    }

    async fn delete(&self, id: &ParcelId, journal: Journal<'_>) -> Result<MutationResult> {
        let mut parcels = self.parcels.write().await;
        let parcel = parcels
            .get(id)
            .cloned()
            .ok_or_else(|| InventoryError::NotFound(id.clone()))?;

        let children = parcels
            .values()
            .filter(|p| p.parent_parcel_id() == Some(id))
            .count();
        if children > 0 {
            return Err(InventoryError::HasChildren {
                parcel_id: id.clone(),
                children,
            });
        }

        let record = journal.record_for(&parcel, 0, Decimal::ZERO)?;
        journal.ledger.append(record.clone()).await?;

        parcels.remove(id);
        Ok(MutationResult { parcel, record })
    }

    async fn adjust_quantities(
        &self,
        id: &ParcelId,
        stones_delta: i64,
        carat_delta: Decimal,
        journal: Journal<'_>,
    ) -> Result<MutationResult> {
        let mut parcels = self.parcels.write().await;
        let parcel = parcels
            .get_mut(id)
            .ok_or_else(|| InventoryError::NotFound(id.clone()))?;

        let (stones, carat, applied_stones, applied_carat) = clamp_adjustment(
            parcel.number_of_stones,
            parcel.total_carat,
            stones_delta,
            carat_delta,
        )?;
        let mut updated = parcel.clone();
        updated.number_of_stones = stones;
        updated.total_carat = carat;
        updated.updated_at = Utc::now();

        let record = journal.record_for(&updated, applied_stones, applied_carat)?;
        journal.ledger.append(record.clone()).await?;

        *parcel = updated.clone();
        Ok(MutationResult {
            parcel: updated,
            record,
        })
    }

    async fn children_of(&self, id: &ParcelId) -> Result<Vec<Parcel>> {
        let parcels = self.parcels.read().await;
        Ok(parcels
            .values()
            .filter(|p| p.parent_parcel_id() == Some(id))
            .cloned()
            .collect())
    }

    async fn all_ids(&self) -> Result<Vec<ParcelId>> {
        Ok(self.parcels.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{child_input, complete_input, journal};
    use ledger::{InMemoryLedger, MovementKind};

    #[tokio::test]
    async fn create_and_get() {
        let store = InMemoryParcelStore::new();
        let created = store.create(complete_input("RB-1")).await.unwrap();

        let loaded = store.get_by_id(&ParcelId::new("RB-1")).await.unwrap();
        assert_eq!(created, loaded);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected_across_parents_and_children() {
        let store = InMemoryParcelStore::new();
        store.create(complete_input("RB-1")).await.unwrap();
        store.create(child_input("RB-1-A", "RB-1")).await.unwrap();

        let dup_parent = store.create(complete_input("RB-1-A")).await;
        assert!(matches!(dup_parent, Err(InventoryError::Validation(_))));

        let dup_child = store.create(child_input("RB-1", "RB-1")).await;
        assert!(matches!(dup_child, Err(InventoryError::Validation(_))));
    }

    #[tokio::test]
    async fn child_requires_existing_parent() {
        let store = InMemoryParcelStore::new();
        let result = store.create(child_input("RB-1-A", "RB-404")).await;
        assert!(matches!(result, Err(InventoryError::Validation(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn grandchildren_are_rejected() {
        let store = InMemoryParcelStore::new();
        store.create(complete_input("RB-1")).await.unwrap();
        store.create(child_input("RB-1-A", "RB-1")).await.unwrap();

        let result = store.create(child_input("RB-1-A-i", "RB-1-A")).await;
        assert!(matches!(result, Err(InventoryError::Validation(_))));
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let store = InMemoryParcelStore::new();
        let ledger = InMemoryLedger::new();
        let id = ParcelId::new("missing");

        assert!(matches!(
            store.get_by_id(&id).await,
            Err(InventoryError::NotFound(_))
        ));
        assert!(matches!(
            store
                .update(&id, &ParcelPatch::default(), journal(&ledger, MovementKind::Edit))
                .await,
            Err(InventoryError::NotFound(_))
        ));
        assert!(matches!(
            store.delete(&id, journal(&ledger, MovementKind::Delete)).await,
            Err(InventoryError::NotFound(_))
        ));
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn rejected_patch_leaves_parcel_untouched() {
        let store = InMemoryParcelStore::new();
        let ledger = InMemoryLedger::new();
        store.create(complete_input("RB-1")).await.unwrap();

        let patch = ParcelPatch {
            comments: Some("recut".to_string()),
            price_per_ct: Some(Decimal::new(-1, 0)),
            ..Default::default()
        };
        let result = store
            .update(&ParcelId::new("RB-1"), &patch, journal(&ledger, MovementKind::Edit))
            .await;
        assert!(result.is_err());

        let parcel = store.get_by_id(&ParcelId::new("RB-1")).await.unwrap();
        assert_eq!(parcel.comments, None);
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn delete_parent_with_children_is_blocked() {
        let store = InMemoryParcelStore::new();
        let ledger = InMemoryLedger::new();
        store.create(complete_input("RB-1")).await.unwrap();
        store.create(child_input("RB-1-A", "RB-1")).await.unwrap();

        let result = store
            .delete(&ParcelId::new("RB-1"), journal(&ledger, MovementKind::Delete))
            .await;
        assert!(matches!(
            result,
            Err(InventoryError::HasChildren { children: 1, .. })
        ));

        for id in ["RB-1-A", "RB-1"] {
            store
                .delete(&ParcelId::new(id), journal(&ledger, MovementKind::Delete))
                .await
                .unwrap();
        }
        assert!(store.is_empty().await);
        assert_eq!(ledger.len().await, 2);
    }

    #[tokio::test]
    async fn concurrent_adjustments_do_not_lose_updates() {
        let store = InMemoryParcelStore::new();
        let ledger = InMemoryLedger::new();
        store.create(complete_input("RB-1")).await.unwrap();
        let id = ParcelId::new("RB-1");

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            let ledger = ledger.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .adjust_quantities(
                        &id,
                        1,
                        Decimal::new(1, 1),
                        journal(&ledger, MovementKind::Add),
                    )
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let parcel = store.get_by_id(&id).await.unwrap();
        assert_eq!(parcel.number_of_stones, 30);
        assert_eq!(parcel.total_carat, Decimal::new(70, 1));
        assert_eq!(ledger.len().await, 20);
    }

    #[tokio::test]
    async fn all_ids_lists_parents_and_children() {
        let store = InMemoryParcelStore::new();
        store.create(complete_input("RB-1")).await.unwrap();
        store.create(child_input("RB-1-A", "RB-1")).await.unwrap();
        store.create(complete_input("PR-2")).await.unwrap();

        let ids = store.all_ids().await.unwrap();
        assert_eq!(
            ids,
            vec![
                ParcelId::new("PR-2"),
                ParcelId::new("RB-1"),
                ParcelId::new("RB-1-A")
            ]
        );
        assert_eq!(store.children_of(&ParcelId::new("RB-1")).await.unwrap().len(), 1);
    }
}
