use async_trait::async_trait;
use common::UserId;
use sqlx::PgPool;
use sqlx::types::Json;

use crate::{HighlightingConfig, Result, SettingsStore};

/// PostgreSQL settings store keeping each config as a JSONB document.
#[derive(Clone)]
pub struct PostgresSettingsStore {
    pool: PgPool,
}

impl PostgresSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for PostgresSettingsStore {
    async fn load(&self, user: &UserId) -> Result<Option<HighlightingConfig>> {
        let stored: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT config FROM highlighting_settings WHERE user_id = $1")
                .bind(user.as_str())
                .fetch_optional(&self.pool)
                .await?;

        // Stored configs were validated on save
        Ok(stored.map(serde_json::from_value::<HighlightingConfig>).transpose()?)
    }

    async fn save(&self, user: &UserId, config: &HighlightingConfig) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO highlighting_settings (user_id, config, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id) DO UPDATE SET config = EXCLUDED.config, updated_at = NOW()
            "#,
        )
        .bind(user.as_str())
        .bind(Json(config))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
