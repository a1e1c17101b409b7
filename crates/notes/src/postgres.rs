use async_trait::async_trait;
use common::{OrderId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::alert::log_alert;
use crate::{AlertSink, NoteError, NoteId, NoteStore, OperatorAlert, Result, StatusNote};

const SELECT_COLUMNS: &str =
    "SELECT id, order_id, status, note, created_by, created_at FROM order_status_notes";

/// PostgreSQL note store. Database errors surface as transient failures.
#[derive(Clone)]
pub struct PostgresNoteStore {
    pool: PgPool,
}

impl PostgresNoteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_note(row: PgRow) -> Result<StatusNote> {
        Ok(StatusNote {
            id: NoteId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            status: row.try_get("status")?,
            note: row.try_get("note")?,
            created_by: UserId::new(row.try_get::<String, _>("created_by")?),
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl NoteStore for PostgresNoteStore {
    async fn insert_if_absent(&self, note: &StatusNote) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO order_status_notes (id, order_id, status, note, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(note.id.as_uuid())
        .bind(note.order_id.as_uuid())
        .bind(&note.status)
        .bind(&note.note)
        .bind(note.created_by.as_str())
        .bind(note.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, id: NoteId) -> Result<Option<StatusNote>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_note).transpose()
    }

    async fn find_by_status(&self, order_id: OrderId, status: &str) -> Result<Vec<StatusNote>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE order_id = $1 AND status = $2 ORDER BY created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(order_id.as_uuid())
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_note).collect()
    }
}

/// Operator alerts kept in the `operator_alerts` table so they survive a
/// restart and are shared by every API instance.
#[derive(Clone)]
pub struct PostgresAlertSink {
    pool: PgPool,
}

impl PostgresAlertSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, alert: &OperatorAlert) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO operator_alerts (order_id, note_id, status, attempts, message, raised_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(alert.order_id.as_uuid())
        .bind(alert.note_id.as_uuid())
        .bind(&alert.status)
        .bind(i64::from(alert.attempts))
        .bind(&alert.message)
        .bind(alert.raised_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_alert(row: PgRow) -> Result<OperatorAlert> {
        let attempts: i64 = row.try_get("attempts")?;
        let attempts = u32::try_from(attempts).map_err(|_| {
            NoteError::transient(format!("stored alert attempts {attempts} out of range"))
        })?;

        Ok(OperatorAlert {
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            note_id: NoteId::from_uuid(row.try_get::<Uuid, _>("note_id")?),
            status: row.try_get("status")?,
            attempts,
            message: row.try_get("message")?,
            raised_at: row.try_get("raised_at")?,
        })
    }
}

#[async_trait]
impl AlertSink for PostgresAlertSink {
    async fn raise(&self, alert: OperatorAlert) {
        log_alert(&alert);
        if let Err(e) = self.insert(&alert).await {
            tracing::error!(
                error = %e,
                order_id = %alert.order_id,
                note_id = %alert.note_id,
                "failed to persist operator alert"
            );
        }
    }

    async fn alerts(&self) -> Result<Vec<OperatorAlert>> {
        let rows = sqlx::query(
            "SELECT order_id, note_id, status, attempts, message, raised_at \
             FROM operator_alerts ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_alert).collect()
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM operator_alerts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as usize)
    }
}
