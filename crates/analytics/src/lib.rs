//! Parcel usage analytics.
//!
//! This crate provides:
//! - [`aggregate_usage`], a pure fold from ledger records to per-parcel usage
//! - [`HighlightingConfig`] with validated bands and colors
//! - [`SettingsStore`] with in-memory and PostgreSQL backends
//! - [`UsageAnalytics`], which turns recent activity into a color per parcel

pub mod error;
pub mod highlight;
pub mod memory;
pub mod postgres;
pub mod service;
pub mod settings;
pub mod store;
pub mod usage;

pub use error::{AnalyticsError, Result};
pub use memory::InMemorySettingsStore;
pub use postgres::PostgresSettingsStore;
pub use service::UsageAnalytics;
pub use settings::{
    Band, Color, FrequencyBands, HighlightMode, HighlightingConfig, MAX_DATE_RANGE_DAYS,
    default_settings,
};
pub use store::SettingsStore;
pub use usage::{UsageAggregate, aggregate_usage};
