//! Per-user highlighting configuration.
//!
//! A config is validated when it is built from untyped input and again
//! before it is saved. Stored configs are trusted on read.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AnalyticsError, Result};

/// Longest supported usage window.
pub const MAX_DATE_RANGE_DAYS: u32 = 3650;

/// A CSS hex color, `#rgb` or `#rrggbb`, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    /// Parses a hex color, rejecting anything else.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        let digits = value
            .strip_prefix('#')
            .filter(|d| matches!(d.len(), 3 | 6) && d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| {
                AnalyticsError::invalid(format!("{value:?} is not a #rgb or #rrggbb color"))
            })?;

        Ok(Self(format!("#{}", digits.to_ascii_lowercase())))
    }

    /// Color for parcels that are not highlighted.
    pub fn neutral() -> Self {
        Self("#ffffff".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Color {
    type Error = AnalyticsError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightMode {
    /// Color by how often a parcel was used in the window.
    #[default]
    Frequency,
    /// Color every parcel used in the window.
    Date,
}

/// A usage-count range and its color.
///
/// Only `min` takes part in matching; `max` documents the intended range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub min: u64,
    pub max: u64,
    pub color: Color,
}

impl Band {
    pub fn new(min: u64, max: u64, color: Color) -> Self {
        Self { min, max, color }
    }

    pub fn matches(&self, usage_count: u64) -> bool {
        usage_count >= self.min
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.min > self.max {
            return Err(AnalyticsError::invalid(format!(
                "{name} band min {} exceeds max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyBands {
    pub low: Band,
    pub medium: Band,
    pub high: Band,
}

impl FrequencyBands {
    /// Returns the color of the highest-priority band that matches.
    ///
    /// Bands are checked high, then medium, then low.
    pub fn classify(&self, usage_count: u64) -> Option<&Color> {
        [&self.high, &self.medium, &self.low]
            .into_iter()
            .find(|band| band.matches(usage_count))
            .map(|band| &band.color)
    }
}

/// Highlighting settings for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightingConfig {
    pub mode: HighlightMode,
    pub date_range_days: u32,
    pub bands: FrequencyBands,
    pub date_color: Color,
}

impl HighlightingConfig {
    /// Builds a config from untyped input and validates it.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value)
            .map_err(|e| AnalyticsError::invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the window length and every band.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_DATE_RANGE_DAYS).contains(&self.date_range_days) {
            return Err(AnalyticsError::invalid(format!(
                "date_range_days must be between 1 and {MAX_DATE_RANGE_DAYS} (got {})",
                self.date_range_days
            )));
        }
        self.bands.low.validate("low")?;
        self.bands.medium.validate("medium")?;
        self.bands.high.validate("high")?;
        Ok(())
    }
}

/// Fallback used when a user has no stored settings.
pub fn default_settings() -> HighlightingConfig {
    HighlightingConfig {
        mode: HighlightMode::Frequency,
        date_range_days: 30,
        bands: FrequencyBands {
            low: Band::new(1, 2, Color("#fef08a".to_string())),
            medium: Band::new(3, 5, Color("#fdba74".to_string())),
            high: Band::new(6, 9999, Color("#f87171".to_string())),
        },
        date_color: Color("#93c5fd".to_string()),
    }
}

impl Default for HighlightingConfig {
    fn default() -> Self {
        default_settings()
    }
}
