//! PostgreSQL operator alert tests
//!
//! Run with:
//!
//! ```bash
//! cargo test -p notes --test postgres_alerts -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use common::{ManualClock, OrderId, UserId};
use notes::{
    AlertSink, InMemoryNoteStore, NoteError, PostgresAlertSink, StaticIdentity, StatusNoteWriter,
    WriterConfig,
};
use serial_test::serial;
use sqlx::PgPool;
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
            sqlx::migrate!("../../migrations")
                .run(&temp_pool)
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
    let pool = PgPool::connect(&info.connection_string).await.unwrap();

    sqlx::query("TRUNCATE TABLE operator_alerts")
        .execute(&pool)
        .await
        .unwrap();
    pool
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn unverified_note_alert_survives_a_restart() {
    let pool = get_test_pool().await;
    let store = InMemoryNoteStore::new();
    store.drop_writes(true).await;
    let writer = StatusNoteWriter::with_clock(
        store,
        PostgresAlertSink::new(pool.clone()),
        WriterConfig::default(),
        ManualClock::default(),
    );
    let order_id = OrderId::new();

    let result = writer
        .record(
            &StaticIdentity::new(UserId::new("workshop-lead")),
            &order_id.to_string(),
            "Ready for pickup",
            "Stones set",
        )
        .await;
    let note_id = match result {
        Err(NoteError::VerificationTimeout { note_id, .. }) => note_id,
        other => panic!("expected verification timeout, got {other:?}"),
    };
    pool.close().await;

    // A fresh pool stands in for a restarted process
    let info = get_container_info().await;
    let sink = PostgresAlertSink::new(PgPool::connect(&info.connection_string).await.unwrap());

    let alerts = sink.alerts().await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].order_id, order_id);
    assert_eq!(alerts[0].note_id, note_id);
    assert_eq!(alerts[0].status, "Ready for pickup");
    assert_eq!(alerts[0].attempts, 3);
    assert_eq!(sink.count().await.unwrap(), 1);
}
