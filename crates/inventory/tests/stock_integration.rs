//! Integration tests for the stock mutation engine.
//!
//! These run the service against the in-memory backends and check the
//! ledger and quantity guarantees across whole mutation sequences.

use common::{ParcelId, UserId};
use inventory::{
    InMemoryParcelStore, InventoryError, NewParcel, ParcelPatch, ParcelStore, StockChange,
    StockService,
};
use ledger::{InMemoryLedger, Ledger, LedgerQuery, MovementKind};
use rust_decimal::Decimal;

fn create_service() -> StockService<InMemoryParcelStore, InMemoryLedger> {
    StockService::new(InMemoryParcelStore::new(), InMemoryLedger::new())
}

fn parcel_input(id: &str, stones: i64, tenths_ct: i64) -> NewParcel {
    NewParcel {
        parcel_id: Some(id.to_string()),
        name: Some(format!("Parcel {id}")),
        shape: Some("Round".to_string()),
        color: Some("D-E".to_string()),
        clarity: Some("VVS".to_string()),
        total_carat: Some(Decimal::new(tenths_ct, 1)),
        number_of_stones: Some(stones),
        price_per_ct: Some(Decimal::new(1200, 0)),
        ..Default::default()
    }
}

fn actor() -> UserId {
    UserId::new("vault-clerk")
}

mod quantities {
    use super::*;

    #[tokio::test]
    async fn add_then_reduce_round_trip() {
        let service = create_service();
        service
            .create_parcel(parcel_input("RB-1", 10, 50))
            .await
            .unwrap();
        let id = ParcelId::new("RB-1");

        service
            .add(
                StockChange::new(id.clone(), actor())
                    .stones(5)
                    .carat(Decimal::new(25, 1)),
            )
            .await
            .unwrap();
        let result = service
            .reduce(
                StockChange::new(id.clone(), actor())
                    .stones(5)
                    .carat(Decimal::new(25, 1)),
            )
            .await
            .unwrap();

        assert_eq!(result.parcel.number_of_stones, 10);
        assert_eq!(result.parcel.total_carat, Decimal::new(50, 1));

        let history = service.history(&id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, MovementKind::Add);
        assert_eq!(history[1].kind, MovementKind::Reduce);
    }

    #[tokio::test]
    async fn over_reduction_clamps_at_zero() {
        let service = create_service();
        service
            .create_parcel(parcel_input("PR-2", 2, 6))
            .await
            .unwrap();
        let id = ParcelId::new("PR-2");

        let result = service
            .reduce(
                StockChange::new(id.clone(), actor())
                    .stones(5)
                    .carat(Decimal::new(10, 1)),
            )
            .await
            .unwrap();

        assert_eq!(result.parcel.number_of_stones, 0);
        assert_eq!(result.parcel.total_carat, Decimal::ZERO);
        assert_eq!(result.record.stones_delta, -2);
        assert_eq!(result.record.ct_weight_delta, Decimal::new(-6, 1));
    }

    #[tokio::test]
    async fn quantities_stay_non_negative_over_a_sequence() {
        let service = create_service();
        service
            .create_parcel(parcel_input("OV-3", 4, 20))
            .await
            .unwrap();
        let id = ParcelId::new("OV-3");

        let steps: [(bool, i64, i64); 8] = [
            (false, 3, 10),
            (true, 1, 2),
            (false, 9, 40),
            (true, 6, 15),
            (false, 2, 3),
            (false, 2, 3),
            (false, 7, 90),
            (true, 1, 1),
        ];
        for (is_add, stones, tenths) in steps {
            let change = StockChange::new(id.clone(), actor())
                .stones(stones)
                .carat(Decimal::new(tenths, 1));
            let result = if is_add {
                service.add(change).await
            } else {
                service.reduce(change).await
            }
            .unwrap();

            assert!(result.parcel.total_carat >= Decimal::ZERO);
            assert_eq!(
                result.record.number_of_stones,
                result.parcel.number_of_stones
            );
        }

        let parcel = service.parcels().get_by_id(&id).await.unwrap();
        assert_eq!(parcel.number_of_stones, 1);
        assert_eq!(parcel.total_carat, Decimal::new(1, 1));

        // The applied deltas replay to the final quantities
        let history = service.history(&id).await.unwrap();
        let replayed: i64 = 4 + history.iter().map(|r| r.stones_delta).sum::<i64>();
        assert_eq!(replayed, 1);
    }
}

mod ledger_accounting {
    use super::*;

    #[tokio::test]
    async fn one_record_per_mutating_call() {
        let service = create_service();
        service
            .create_parcel(parcel_input("RB-1", 10, 50))
            .await
            .unwrap();
        service
            .create_subcategory(&ParcelId::new("RB-1"), parcel_input("RB-1-A", 3, 9))
            .await
            .unwrap();
        let parent = ParcelId::new("RB-1");
        let child = ParcelId::new("RB-1-A");

        service
            .add(StockChange::new(parent.clone(), actor()).stones(1))
            .await
            .unwrap();
        service
            .reduce(StockChange::new(child.clone(), actor()).stones(1))
            .await
            .unwrap();
        service
            .edit(
                &parent,
                ParcelPatch {
                    description: Some("Calibrated 1.3mm".to_string()),
                    ..Default::default()
                },
                actor(),
            )
            .await
            .unwrap();
        service.delete(&child, actor()).await.unwrap();

        // Failed calls write nothing
        let _ = service
            .reduce(StockChange::new(parent.clone(), actor()).stones(-2))
            .await;
        let _ = service.delete(&ParcelId::new("missing"), actor()).await;

        let all = service.ledger().query(LedgerQuery::new()).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(service.ledger().count_for_parcel(&parent).await.unwrap(), 2);
        assert_eq!(service.ledger().count_for_parcel(&child).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn records_carry_actor_and_comment() {
        let service = create_service();
        service
            .create_parcel(parcel_input("RB-1", 10, 50))
            .await
            .unwrap();

        let result = service
            .reduce(
                StockChange::new("RB-1", UserId::new("setter-7"))
                    .stones(2)
                    .comment("memo 4411"),
            )
            .await
            .unwrap();

        assert_eq!(result.record.actor.as_str(), "setter-7");
        assert_eq!(result.record.comment.as_deref(), Some("memo 4411"));
    }
}

mod hierarchy {
    use super::*;

    #[tokio::test]
    async fn deleting_parent_with_children_is_blocked() {
        let service = create_service();
        service
            .create_parcel(parcel_input("RB-1", 10, 50))
            .await
            .unwrap();
        service
            .create_subcategory(&ParcelId::new("RB-1"), parcel_input("RB-1-A", 3, 9))
            .await
            .unwrap();

        let result = service.delete(&ParcelId::new("RB-1"), actor()).await;
        assert!(matches!(result, Err(InventoryError::HasChildren { .. })));
        assert!(service.ledger().is_empty().await);

        service
            .delete(&ParcelId::new("RB-1-A"), actor())
            .await
            .unwrap();
        service.delete(&ParcelId::new("RB-1"), actor()).await.unwrap();
        assert!(service.parcels().is_empty().await);
    }

    #[tokio::test]
    async fn subcategory_under_missing_parent_is_rejected() {
        let service = create_service();

        let result = service
            .create_subcategory(&ParcelId::new("nope"), parcel_input("RB-1-A", 3, 9))
            .await;
        assert!(matches!(result, Err(InventoryError::Validation(_))));
    }
}
