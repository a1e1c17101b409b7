//! Parcel search criteria.

use std::cmp::Ordering;

use common::ParcelId;
use serde::{Deserialize, Serialize};

use crate::Parcel;

/// Column a search result is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    ParcelId,
    Name,
    TotalCarat,
    NumberOfStones,
    PricePerCt,
    UpdatedAt,
}

impl SortField {
    /// Returns the storage column for this field.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::ParcelId => "parcel_id",
            SortField::Name => "name",
            SortField::TotalCarat => "total_carat",
            SortField::NumberOfStones => "number_of_stones",
            SortField::PricePerCt => "price_per_ct",
            SortField::UpdatedAt => "updated_at",
        }
    }

    fn compare(&self, a: &Parcel, b: &Parcel) -> Ordering {
        match self {
            SortField::ParcelId => a.parcel_id.cmp(&b.parcel_id),
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::TotalCarat => a.total_carat.cmp(&b.total_carat),
            SortField::NumberOfStones => a.number_of_stones.cmp(&b.number_of_stones),
            SortField::PricePerCt => a.price_per_ct.cmp(&b.price_per_ct),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Multi-field search with sorting and paging.
///
/// `query` is a case-insensitive substring match against the id, name and
/// descriptive fields; the other filters are case-insensitive equality.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParcelSearch {
    pub query: Option<String>,
    pub shape: Option<String>,
    pub color: Option<String>,
    pub clarity: Option<String>,
    pub parents_only: bool,
    pub children_of: Option<ParcelId>,
    pub sort_by: SortField,
    pub direction: SortDirection,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

fn eq_ignore_case(filter: &Option<String>, value: &str) -> bool {
    match filter.as_deref().map(str::trim) {
        Some(f) if !f.is_empty() => f.eq_ignore_ascii_case(value.trim()),
        _ => true,
    }
}

impl ParcelSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn shape(mut self, shape: impl Into<String>) -> Self {
        self.shape = Some(shape.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn clarity(mut self, clarity: impl Into<String>) -> Self {
        self.clarity = Some(clarity.into());
        self
    }

    pub fn parents_only(mut self) -> Self {
        self.parents_only = true;
        self
    }

    pub fn children_of(mut self, parent: ParcelId) -> Self {
        self.children_of = Some(parent);
        self
    }

    pub fn sort_by(mut self, field: SortField, direction: SortDirection) -> Self {
        self.sort_by = field;
        self.direction = direction;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns the trimmed, lowercased free-text term, if any.
    pub fn term(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    /// Returns true if the parcel satisfies every filter.
    pub fn matches(&self, parcel: &Parcel) -> bool {
        if self.parents_only && !parcel.is_parent() {
            return false;
        }
        if let Some(ref parent) = self.children_of
            && parcel.parent_parcel_id() != Some(parent)
        {
            return false;
        }
        if !eq_ignore_case(&self.shape, &parcel.shape)
            || !eq_ignore_case(&self.color, &parcel.color)
            || !eq_ignore_case(&self.clarity, &parcel.clarity)
        {
            return false;
        }

        let Some(term) = self.term() else {
            return true;
        };
        [
            Some(parcel.parcel_id.as_str()),
            Some(parcel.name.as_str()),
            Some(parcel.shape.as_str()),
            Some(parcel.color.as_str()),
            Some(parcel.clarity.as_str()),
            parcel.cut.as_deref(),
            parcel.sieve_size.as_deref(),
            parcel.comments.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&term))
    }

    /// Filters, sorts and pages an in-memory parcel list.
    pub fn apply(&self, parcels: impl IntoIterator<Item = Parcel>) -> Vec<Parcel> {
        let mut results: Vec<Parcel> = parcels.into_iter().filter(|p| self.matches(p)).collect();

        results.sort_by(|a, b| {
            let ordering = self
                .sort_by
                .compare(a, b)
                .then_with(|| a.parcel_id.cmp(&b.parcel_id));
            match self.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let results = results.into_iter().skip(self.offset.unwrap_or(0));
        match self.limit {
            Some(limit) => results.take(limit).collect(),
            None => results.collect(),
        }
    }
}
