use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;

use crate::{HighlightingConfig, Result};

/// Persistence for per-user highlighting settings.
///
/// Implementations store configs as given; callers validate before saving.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Returns the stored config, or `None` if the user has none.
    async fn load(&self, user: &UserId) -> Result<Option<HighlightingConfig>>;

    /// Replaces the user's config.
    async fn save(&self, user: &UserId, config: &HighlightingConfig) -> Result<()>;
}

#[async_trait]
impl<T: SettingsStore + ?Sized> SettingsStore for Arc<T> {
    async fn load(&self, user: &UserId) -> Result<Option<HighlightingConfig>> {
        (**self).load(user).await
    }

    async fn save(&self, user: &UserId, config: &HighlightingConfig) -> Result<()> {
        (**self).save(user, config).await
    }
}
