//! Mapping usage to highlight colors.

use std::collections::BTreeMap;

use common::ParcelId;

use crate::{Color, HighlightMode, HighlightingConfig, UsageAggregate};

/// Colors every parcel that appears in `usage`.
///
/// In frequency mode a parcel whose count matches no band is neutral. In
/// date mode every parcel with activity gets the date color.
pub fn classify(
    config: &HighlightingConfig,
    usage: &BTreeMap<ParcelId, UsageAggregate>,
) -> BTreeMap<ParcelId, Color> {
    usage
        .iter()
        .map(|(id, aggregate)| {
            let color = match config.mode {
                HighlightMode::Frequency => config
                    .bands
                    .classify(aggregate.usage_count)
                    .cloned()
                    .unwrap_or_else(Color::neutral),
                HighlightMode::Date => config.date_color.clone(),
            };
            (id.clone(), color)
        })
        .collect()
}

/// Produces exactly one color per catalog ID.
///
/// IDs without activity are neutral. Colors for IDs missing from the catalog
/// are dropped.
pub fn complete(
    catalog: impl IntoIterator<Item = ParcelId>,
    highlighted: &BTreeMap<ParcelId, Color>,
) -> BTreeMap<ParcelId, Color> {
    catalog
        .into_iter()
        .map(|id| {
            let color = highlighted.get(&id).cloned().unwrap_or_else(Color::neutral);
            (id, color)
        })
        .collect()
}
