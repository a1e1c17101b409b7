use async_trait::async_trait;
use chrono::Utc;
use common::ParcelId;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::store::{Journal, clamp_adjustment};
use crate::{
    InventoryError, MutationResult, NewParcel, Parcel, ParcelKind, ParcelPatch, ParcelSearch,
    ParcelStore, Result, SortDirection,
};

const SELECT_COLUMNS: &str = "SELECT parcel_id, parent_parcel_id, name, shape, color, clarity, cut, sieve_size, description, total_carat, number_of_stones, price_per_ct, ws_price_per_ct, is_editable, comments, created_at, updated_at FROM parcels";

/// PostgreSQL-backed parcel store.
///
/// Mutations lock the row with `SELECT ... FOR UPDATE` and write the journal
/// record inside the same transaction, so a parcel change and its ledger
/// entry commit together. Depth and non-negativity are also enforced by the
/// schema.
#[derive(Clone)]
pub struct PostgresParcelStore {
    pool: PgPool,
}

impl PostgresParcelStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_parcel(row: PgRow) -> Result<Parcel> {
        let kind = match row.try_get::<Option<String>, _>("parent_parcel_id")? {
            Some(parent) => ParcelKind::Child {
                parent_id: ParcelId::new(parent),
            },
            None => ParcelKind::Parent,
        };
        let stones: i64 = row.try_get("number_of_stones")?;
        let number_of_stones = u32::try_from(stones).map_err(|_| {
            InventoryError::validation(format!("stored stone count {stones} out of range"))
        })?;

        Ok(Parcel {
            parcel_id: ParcelId::new(row.try_get::<String, _>("parcel_id")?),
            kind,
            name: row.try_get("name")?,
            shape: row.try_get("shape")?,
            color: row.try_get("color")?,
            clarity: row.try_get("clarity")?,
            cut: row.try_get("cut")?,
            sieve_size: row.try_get("sieve_size")?,
            description: row.try_get("description")?,
            total_carat: row.try_get("total_carat")?,
            number_of_stones,
            price_per_ct: row.try_get("price_per_ct")?,
            ws_price_per_ct: row.try_get("ws_price_per_ct")?,
            is_editable: row.try_get("is_editable")?,
            comments: row.try_get("comments")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn fetch_one(&self, id: &ParcelId) -> Result<Option<Parcel>> {
        let sql = format!("{SELECT_COLUMNS} WHERE parcel_id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_parcel).transpose()
    }
}

/// Escapes `ILIKE` wildcards so the term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl ParcelStore for PostgresParcelStore {
    async fn get_all(&self) -> Result<Vec<Parcel>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY parcel_id ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_parcel).collect()
    }

    async fn get_by_id(&self, id: &ParcelId) -> Result<Parcel> {
        self.fetch_one(id)
            .await?
            .ok_or_else(|| InventoryError::NotFound(id.clone()))
    }

    async fn search(&self, criteria: &ParcelSearch) -> Result<Vec<Parcel>> {
        let mut sql = format!("{SELECT_COLUMNS} WHERE 1=1");
        let mut param_count = 0;

        let term = criteria.term().map(|t| format!("%{}%", escape_like(&t)));
        if term.is_some() {
            param_count += 1;
            let columns = [
                "parcel_id",
                "name",
                "shape",
                "color",
                "clarity",
                "cut",
                "sieve_size",
                "comments",
            ];
            let clauses: Vec<String> = columns
                .iter()
                .map(|column| format!("{column} ILIKE ${param_count} ESCAPE '\\'"))
                .collect();
            sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
        }

        let filters: Vec<(&str, Option<&str>)> = vec![
            ("shape", criteria.shape.as_deref()),
            ("color", criteria.color.as_deref()),
            ("clarity", criteria.clarity.as_deref()),
        ]
        .into_iter()
        .map(|(column, value)| (column, value.map(str::trim).filter(|v| !v.is_empty())))
        .collect();
        for (column, value) in &filters {
            if value.is_some() {
                param_count += 1;
                sql.push_str(&format!(" AND LOWER({column}) = LOWER(${param_count})"));
            }
        }

        if criteria.parents_only {
            sql.push_str(" AND parent_parcel_id IS NULL");
        }
        if criteria.children_of.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND parent_parcel_id = ${param_count}"));
        }

        // Column names come from a fixed whitelist
        let direction = match criteria.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        sql.push_str(&format!(
            " ORDER BY {} {direction}, parcel_id {direction}",
            criteria.sort_by.column()
        ));

        if criteria.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if criteria.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut query = sqlx::query(&sql);
        if let Some(term) = term {
            query = query.bind(term);
        }
        for (_, value) in filters {
            if let Some(value) = value {
                query = query.bind(value.to_string());
            }
        }
        if let Some(ref parent) = criteria.children_of {
            query = query.bind(parent.as_str().to_string());
        }
        if let Some(limit) = criteria.limit {
            query = query.bind(limit as i64);
        }
        if let Some(offset) = criteria.offset {
            query = query.bind(offset as i64);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_parcel).collect()
    }

    async fn create(&self, data: NewParcel) -> Result<Parcel> {
        let kind = match data.parent_id() {
            None => ParcelKind::Parent,
            Some(parent_id) => match self.fetch_one(&parent_id).await? {
                Some(parent) if parent.is_parent() => ParcelKind::Child { parent_id },
                Some(_) => {
                    return Err(InventoryError::validation(format!(
                        "parent {parent_id} is itself a sub-parcel"
                    )));
                }
                None => {
                    return Err(InventoryError::validation(format!(
                        "parent {parent_id} does not exist"
                    )));
                }
            },
        };
        let parcel = data.into_parcel(kind, Utc::now())?;

        sqlx::query(
            r#"
            INSERT INTO parcels
                (parcel_id, parent_parcel_id, name, shape, color, clarity, cut, sieve_size,
                 description, total_carat, number_of_stones, price_per_ct, ws_price_per_ct,
                 is_editable, comments, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(parcel.parcel_id.as_str())
        .bind(parcel.parent_parcel_id().map(ParcelId::as_str))
        .bind(&parcel.name)
        .bind(&parcel.shape)
        .bind(&parcel.color)
        .bind(&parcel.clarity)
        .bind(&parcel.cut)
        .bind(&parcel.sieve_size)
        .bind(&parcel.description)
        .bind(parcel.total_carat)
        .bind(i64::from(parcel.number_of_stones))
        .bind(parcel.price_per_ct)
        .bind(parcel.ws_price_per_ct)
        .bind(parcel.is_editable)
        .bind(&parcel.comments)
        .bind(parcel.created_at)
        .bind(parcel.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return InventoryError::validation(format!(
                        "parcel {} already exists",
                        parcel.parcel_id
                    ));
                }
                if db_err.is_check_violation() || db_err.is_foreign_key_violation() {
                    return InventoryError::validation(db_err.message().to_string());
                }
            }
            InventoryError::Database(e)
        })?;

        Ok(parcel)
    }

    async fn update(
        &self,
        id: &ParcelId,
        patch: &ParcelPatch,
        journal: Journal<'_>,
    ) -> Result<MutationResult> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("{SELECT_COLUMNS} WHERE parcel_id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| InventoryError::NotFound(id.clone()))?;
        let mut parcel = Self::row_to_parcel(row)?;
        patch.apply(&mut parcel, Utc::now())?;

        sqlx::query(
            r#"
            UPDATE parcels SET
                name = $2, shape = $3, color = $4, clarity = $5, cut = $6, sieve_size = $7,
                description = $8, price_per_ct = $9, ws_price_per_ct = $10, is_editable = $11,
                comments = $12, updated_at = $13
            WHERE parcel_id = $1
            "#,
        )
        .bind(id.as_str())
        .bind(&parcel.name)
        .bind(&parcel.shape)
        .bind(&parcel.color)
        .bind(&parcel.clarity)
        .bind(&parcel.cut)
        .bind(&parcel.sieve_size)
        .bind(&parcel.description)
        .bind(parcel.price_per_ct)
        .bind(parcel.ws_price_per_ct)
        .bind(parcel.is_editable)
        .bind(&parcel.comments)
        .bind(parcel.updated_at)
        .execute(&mut *tx)
        .await?;

        let record = journal.record_for(&parcel, 0, Decimal::ZERO)?;
        journal.ledger.append_in(&mut *tx, record.clone()).await?;

        tx.commit().await?;
        Ok(MutationResult { parcel, record })
    }

    async fn delete(&self, id: &ParcelId, journal: Journal<'_>) -> Result<MutationResult> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("{SELECT_COLUMNS} WHERE parcel_id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| InventoryError::NotFound(id.clone()))?;
        let parcel = Self::row_to_parcel(row)?;

        let children: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM parcels WHERE parent_parcel_id = $1")
                .bind(id.as_str())
                .fetch_one(&mut *tx)
                .await?;
        if children > 0 {
            return Err(InventoryError::HasChildren {
                parcel_id: id.clone(),
                children: children as usize,
            });
        }

        sqlx::query("DELETE FROM parcels WHERE parcel_id = $1")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        let record = journal.record_for(&parcel, 0, Decimal::ZERO)?;
        journal.ledger.append_in(&mut *tx, record.clone()).await?;

        tx.commit().await?;
        Ok(MutationResult { parcel, record })
    }

    async fn adjust_quantities(
        &self,
        id: &ParcelId,
        stones_delta: i64,
        carat_delta: Decimal,
        journal: Journal<'_>,
    ) -> Result<MutationResult> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("{SELECT_COLUMNS} WHERE parcel_id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| InventoryError::NotFound(id.clone()))?;
        let mut parcel = Self::row_to_parcel(row)?;

        let (stones, carat, applied_stones, applied_carat) = clamp_adjustment(
            parcel.number_of_stones,
            parcel.total_carat,
            stones_delta,
            carat_delta,
        )?;
        parcel.number_of_stones = stones;
        parcel.total_carat = carat;
        parcel.updated_at = Utc::now();

        sqlx::query(
            "UPDATE parcels SET number_of_stones = $2, total_carat = $3, updated_at = $4 WHERE parcel_id = $1",
        )
        .bind(id.as_str())
        .bind(i64::from(stones))
        .bind(carat)
        .bind(parcel.updated_at)
        .execute(&mut *tx)
        .await?;

        let record = journal.record_for(&parcel, applied_stones, applied_carat)?;
        journal.ledger.append_in(&mut *tx, record.clone()).await?;

        tx.commit().await?;
        Ok(MutationResult { parcel, record })
    }

    async fn children_of(&self, id: &ParcelId) -> Result<Vec<Parcel>> {
        let sql = format!("{SELECT_COLUMNS} WHERE parent_parcel_id = $1 ORDER BY parcel_id ASC");
        let rows = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_parcel).collect()
    }

    async fn all_ids(&self) -> Result<Vec<ParcelId>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT parcel_id FROM parcels ORDER BY parcel_id ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().map(ParcelId::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("RB_1"), "RB\\_1");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
        assert_eq!(escape_like("Round"), "Round");
    }
}
