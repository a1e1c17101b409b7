use async_trait::async_trait;
use common::{ParcelId, UserId};
use sqlx::{PgConnection, PgExecutor, PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{Ledger, LedgerError, LedgerQuery, MovementId, MovementKind, MovementRecord, Result};

const SELECT_COLUMNS: &str = "SELECT id, parcel_id, kind, ct_weight_delta, stones_delta, total_carat, number_of_stones, comment, actor, timestamp FROM stock_movements";

/// PostgreSQL-backed ledger implementation.
#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Creates a new PostgreSQL ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations for every stock ledger table.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_record(row: PgRow) -> Result<MovementRecord> {
        let kind: String = row.try_get("kind")?;
        let kind = MovementKind::parse(&kind)
            .ok_or_else(|| LedgerError::InvalidRow(format!("unknown movement kind {kind:?}")))?;
        let stones: i64 = row.try_get("number_of_stones")?;
        let number_of_stones = u32::try_from(stones)
            .map_err(|_| LedgerError::InvalidRow(format!("stone count {stones} out of range")))?;

        Ok(MovementRecord {
            id: MovementId::from_uuid(row.try_get::<Uuid, _>("id")?),
            parcel_id: ParcelId::new(row.try_get::<String, _>("parcel_id")?),
            kind,
            ct_weight_delta: row.try_get("ct_weight_delta")?,
            stones_delta: row.try_get("stones_delta")?,
            total_carat: row.try_get("total_carat")?,
            number_of_stones,
            comment: row.try_get("comment")?,
            actor: UserId::new(row.try_get::<String, _>("actor")?),
            timestamp: row.try_get("timestamp")?,
        })
    }

    async fn insert<'e>(executor: impl PgExecutor<'e>, record: MovementRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_movements
                (id, parcel_id, kind, ct_weight_delta, stones_delta, total_carat, number_of_stones, comment, actor, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.parcel_id.as_str())
        .bind(record.kind.as_str())
        .bind(record.ct_weight_delta)
        .bind(record.stones_delta)
        .bind(record.total_carat)
        .bind(i64::from(record.number_of_stones))
        .bind(&record.comment)
        .bind(record.actor.as_str())
        .bind(record.timestamp)
        .execute(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return LedgerError::DuplicateEntry(record.id);
            }
            LedgerError::Database(e)
        })?;

        Ok(())
    }
}

#[async_trait]
impl Ledger for PostgresLedger {
    async fn append(&self, record: MovementRecord) -> Result<()> {
        Self::insert(&self.pool, record).await
    }

    async fn append_in(&self, conn: &mut PgConnection, record: MovementRecord) -> Result<()> {
        Self::insert(conn, record).await
    }

    async fn entries_for_parcel(&self, parcel_id: &ParcelId) -> Result<Vec<MovementRecord>> {
        let sql = format!("{SELECT_COLUMNS} WHERE parcel_id = $1 ORDER BY timestamp ASC");
        let rows = sqlx::query(&sql)
            .bind(parcel_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn query(&self, query: LedgerQuery) -> Result<Vec<MovementRecord>> {
        let mut sql = format!("{SELECT_COLUMNS} WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.parcel_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND parcel_id = ${param_count}"));
        }
        if query.kinds.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND kind = ANY(${param_count})"));
        }
        if query.from_timestamp.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND timestamp >= ${param_count}"));
        }
        if query.to_timestamp.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND timestamp <= ${param_count}"));
        }

        sql.push_str(" ORDER BY timestamp ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(ref id) = query.parcel_id {
            sqlx_query = sqlx_query.bind(id.as_str().to_string());
        }
        if let Some(ref kinds) = query.kinds {
            let names: Vec<String> = kinds.iter().map(|k| k.as_str().to_string()).collect();
            sqlx_query = sqlx_query.bind(names);
        }
        if let Some(from) = query.from_timestamp {
            sqlx_query = sqlx_query.bind(from);
        }
        if let Some(to) = query.to_timestamp {
            sqlx_query = sqlx_query.bind(to);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn count_for_parcel(&self, parcel_id: &ParcelId) -> Result<usize> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements WHERE parcel_id = $1")
                .bind(parcel_id.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(count as usize)
    }
}
