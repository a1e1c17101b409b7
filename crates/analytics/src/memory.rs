use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use tokio::sync::RwLock;

use crate::{HighlightingConfig, Result, SettingsStore};

/// In-memory settings store for testing and database-less runs.
#[derive(Clone, Default)]
pub struct InMemorySettingsStore {
    configs: Arc<RwLock<HashMap<UserId, HighlightingConfig>>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn load(&self, user: &UserId) -> Result<Option<HighlightingConfig>> {
        Ok(self.configs.read().await.get(user).cloned())
    }

    async fn save(&self, user: &UserId, config: &HighlightingConfig) -> Result<()> {
        self.configs
            .write()
            .await
            .insert(user.clone(), config.clone());
        Ok(())
    }
}
