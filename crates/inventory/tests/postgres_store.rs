//! PostgreSQL parcel store tests
//!
//! Run with:
//!
//! ```bash
//! cargo test -p inventory --test postgres_store -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{ParcelId, UserId};
use inventory::{
    InventoryError, Journal, NewParcel, ParcelSearch, ParcelStore, PostgresParcelStore,
    SortDirection, SortField, StockChange, StockService,
};
use ledger::{Ledger, LedgerError, LedgerQuery, MovementKind, MovementRecord, PostgresLedger};
use rust_decimal::Decimal;
use serial_test::serial;
use sqlx::{PgConnection, PgPool};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();
            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();
            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresLedger::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_pool() -> PgPool {
    let info = get_container_info().await;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE parcels, stock_movements")
        .execute(&pool)
        .await
        .unwrap();
    pool
}

fn journal(ledger: &dyn Ledger, kind: MovementKind) -> Journal<'_> {
    Journal {
        ledger,
        kind,
        comment: None,
        actor: UserId::new("clerk"),
        timestamp: Utc::now(),
    }
}

/// Writes through the real ledger, then fails as if the commit step broke.
struct FailAfterWriteLedger(PostgresLedger);

#[async_trait]
impl Ledger for FailAfterWriteLedger {
    async fn append(&self, record: MovementRecord) -> ledger::Result<()> {
        self.0.append(record).await
    }

    async fn append_in(
        &self,
        conn: &mut PgConnection,
        record: MovementRecord,
    ) -> ledger::Result<()> {
        self.0.append_in(conn, record).await?;
        Err(LedgerError::InvalidRow("rejected after write".to_string()))
    }

    async fn entries_for_parcel(
        &self,
        parcel_id: &ParcelId,
    ) -> ledger::Result<Vec<MovementRecord>> {
        self.0.entries_for_parcel(parcel_id).await
    }

    async fn query(&self, query: LedgerQuery) -> ledger::Result<Vec<MovementRecord>> {
        self.0.query(query).await
    }

    async fn count_for_parcel(&self, parcel_id: &ParcelId) -> ledger::Result<usize> {
        self.0.count_for_parcel(parcel_id).await
    }
}

fn parcel_input(id: &str, parent: Option<&str>, tenths_ct: i64) -> NewParcel {
    NewParcel {
        parcel_id: Some(id.to_string()),
        parent_parcel_id: parent.map(str::to_string),
        name: Some(format!("Melee {id}")),
        shape: Some("Round".to_string()),
        color: Some("G-H".to_string()),
        clarity: Some("SI".to_string()),
        total_carat: Some(Decimal::new(tenths_ct, 1)),
        number_of_stones: Some(20),
        price_per_ct: Some(Decimal::new(32000, 2)),
        ..Default::default()
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn create_search_and_delete() {
    let store = PostgresParcelStore::new(get_test_pool().await);
    store.create(parcel_input("RB-1", None, 30)).await.unwrap();
    store.create(parcel_input("RB-2", None, 12)).await.unwrap();
    store
        .create(parcel_input("RB-1-A", Some("RB-1"), 5))
        .await
        .unwrap();

    let grandchild = store.create(parcel_input("RB-1-A-i", Some("RB-1-A"), 1)).await;
    assert!(matches!(grandchild, Err(InventoryError::Validation(_))));
    let duplicate = store.create(parcel_input("RB-2", None, 1)).await;
    assert!(matches!(duplicate, Err(InventoryError::Validation(_))));

    let results = store
        .search(
            &ParcelSearch::new()
                .query("melee")
                .parents_only()
                .sort_by(SortField::TotalCarat, SortDirection::Desc),
        )
        .await
        .unwrap();
    let ids: Vec<_> = results.iter().map(|p| p.parcel_id.as_str()).collect();
    assert_eq!(ids, vec!["RB-1", "RB-2"]);

    let ledger = PostgresLedger::new(store.pool().clone());
    let blocked = store
        .delete(&ParcelId::new("RB-1"), journal(&ledger, MovementKind::Delete))
        .await;
    assert!(matches!(blocked, Err(InventoryError::HasChildren { children: 1, .. })));
    for id in ["RB-1-A", "RB-1"] {
        store
            .delete(&ParcelId::new(id), journal(&ledger, MovementKind::Delete))
            .await
            .unwrap();
    }
    assert_eq!(store.all_ids().await.unwrap(), vec![ParcelId::new("RB-2")]);
    assert_eq!(ledger.count_for_parcel(&ParcelId::new("RB-1")).await.unwrap(), 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn concurrent_reductions_are_serialized() {
    let pool = get_test_pool().await;
    let service = Arc::new(StockService::new(
        PostgresParcelStore::new(pool.clone()),
        PostgresLedger::new(pool),
    ));
    service
        .create_parcel(parcel_input("RB-1", None, 30))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service
                .reduce(StockChange::new("RB-1", UserId::new("clerk")).stones(3))
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let id = ParcelId::new("RB-1");
    let parcel = service.parcels().get_by_id(&id).await.unwrap();
    assert_eq!(parcel.number_of_stones, 0);

    let history = service.history(&id).await.unwrap();
    assert_eq!(history.len(), 8);
    let removed: i64 = history.iter().map(|r| r.stones_delta).sum();
    assert_eq!(removed, -20);
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn failed_journal_rolls_back_the_mutation() {
    let pool = get_test_pool().await;
    let store = PostgresParcelStore::new(pool.clone());
    let ledger = FailAfterWriteLedger(PostgresLedger::new(pool));
    store.create(parcel_input("RB-1", None, 30)).await.unwrap();
    let id = ParcelId::new("RB-1");

    let result = store
        .adjust_quantities(&id, -5, Decimal::ZERO, journal(&ledger, MovementKind::Reduce))
        .await;
    assert!(matches!(result, Err(InventoryError::Ledger(_))));
    let result = store.delete(&id, journal(&ledger, MovementKind::Delete)).await;
    assert!(result.is_err());

    let parcel = store.get_by_id(&id).await.unwrap();
    assert_eq!(parcel.number_of_stones, 20);
    assert_eq!(ledger.count_for_parcel(&id).await.unwrap(), 0);
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn search_treats_wildcards_literally() {
    let store = PostgresParcelStore::new(get_test_pool().await);
    store.create(parcel_input("RB_1", None, 10)).await.unwrap();
    store.create(parcel_input("RBX1", None, 10)).await.unwrap();
    store.create(parcel_input("PR-100%", None, 10)).await.unwrap();

    let ids = |parcels: Vec<inventory::Parcel>| -> Vec<String> {
        parcels
            .into_iter()
            .map(|p| p.parcel_id.as_str().to_string())
            .collect()
    };

    let underscore = store.search(&ParcelSearch::new().query("RB_")).await.unwrap();
    assert_eq!(ids(underscore), vec!["RB_1"]);

    let percent = store.search(&ParcelSearch::new().query("%")).await.unwrap();
    assert_eq!(ids(percent), vec!["PR-100%"]);
}
