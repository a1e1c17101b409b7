//! Usage analytics service.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Duration;
use common::{Clock, ParcelId, SystemClock, UserId};
use inventory::ParcelStore;
use ledger::{Ledger, LedgerExt};

use crate::highlight::{classify, complete};
use crate::{
    AnalyticsError, Color, HighlightingConfig, Result, SettingsStore, UsageAggregate, aggregate_usage,
    default_settings,
};

/// Derives usage statistics from the ledger and maps them to colors.
///
/// Aggregates are recomputed from a ledger scan on every call.
pub struct UsageAnalytics<P, L, S, C = SystemClock>
where
    P: ParcelStore,
    L: Ledger,
    S: SettingsStore,
    C: Clock,
{
    parcels: P,
    ledger: L,
    settings: S,
    clock: C,
}

impl<P: ParcelStore, L: Ledger, S: SettingsStore> UsageAnalytics<P, L, S> {
    pub fn new(parcels: P, ledger: L, settings: S) -> Self {
        Self::with_clock(parcels, ledger, settings, SystemClock)
    }
}

impl<P, L, S, C> UsageAnalytics<P, L, S, C>
where
    P: ParcelStore,
    L: Ledger,
    S: SettingsStore,
    C: Clock,
{
    /// Creates a service whose usage windows end at `clock.now()`.
    pub fn with_clock(parcels: P, ledger: L, settings: S, clock: C) -> Self {
        Self {
            parcels,
            ledger,
            settings,
            clock,
        }
    }

    /// Returns usage per parcel over the last `date_range_days` days.
    ///
    /// Fails with `InvalidConfig` if the window reaches past the earliest
    /// representable timestamp.
    #[tracing::instrument(skip(self))]
    pub async fn get_parcel_usage_data(
        &self,
        date_range_days: u32,
    ) -> Result<BTreeMap<ParcelId, UsageAggregate>> {
        let since = Duration::try_days(i64::from(date_range_days))
            .and_then(|window| self.clock.now().checked_sub_signed(window))
            .ok_or_else(|| {
                AnalyticsError::invalid(format!(
                    "date_range_days {date_range_days} reaches before the earliest supported date"
                ))
            })?;
        let records = self.ledger.entries_since(since).await?;

        let usage = aggregate_usage(&records, since);
        tracing::debug!(records = records.len(), parcels = usage.len(), "usage aggregated");
        Ok(usage)
    }

    /// Colors the parcels that have activity in the configured window.
    #[tracing::instrument(skip(self, config), fields(mode = ?config.mode))]
    pub async fn generate_highlighting_data(
        &self,
        config: &HighlightingConfig,
    ) -> Result<BTreeMap<ParcelId, Color>> {
        let usage = self.get_parcel_usage_data(config.date_range_days).await?;
        Ok(classify(config, &usage))
    }

    /// Returns every catalog ID, parents and children.
    pub async fn get_all_parcel_ids(&self) -> Result<Vec<ParcelId>> {
        Ok(self.parcels.all_ids().await?)
    }

    /// Colors every catalog parcel, neutral where there is no activity.
    #[tracing::instrument(skip(self, config), fields(mode = ?config.mode))]
    pub async fn generate_complete_highlighting_data(
        &self,
        config: &HighlightingConfig,
    ) -> Result<BTreeMap<ParcelId, Color>> {
        let started = Instant::now();

        let (highlighted, ids) = futures_util::future::try_join(
            self.generate_highlighting_data(config),
            self.get_all_parcel_ids(),
        )
        .await?;
        let colors = complete(ids, &highlighted);

        metrics::histogram!("highlighting_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::debug!(parcels = colors.len(), "highlighting generated");
        Ok(colors)
    }

    /// Returns the user's settings, or the defaults if none are stored.
    #[tracing::instrument(skip(self))]
    pub async fn load_settings(&self, user: &UserId) -> Result<HighlightingConfig> {
        Ok(self
            .settings
            .load(user)
            .await?
            .unwrap_or_else(default_settings))
    }

    /// Validates and stores the user's settings.
    #[tracing::instrument(skip(self, config))]
    pub async fn save_settings(&self, user: &UserId, config: &HighlightingConfig) -> Result<()> {
        config.validate().inspect_err(|e| {
            tracing::warn!(error = %e, "rejected highlighting settings");
        })?;
        self.settings.save(user, config).await
    }

    /// Settings used when a user has none stored.
    pub fn default_settings(&self) -> HighlightingConfig {
        default_settings()
    }
}
