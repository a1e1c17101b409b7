//! Parcel model and input validation.

use chrono::{DateTime, Utc};
use common::ParcelId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, Result};

/// Decimal places kept for carat weights, matching `NUMERIC(12, 3)`.
pub const CARAT_SCALE: u32 = 3;

/// Largest carat weight a parcel or a ledger delta can hold.
pub const MAX_CARAT: Decimal = Decimal::from_parts(0xd4a50fff, 0xe8, 0, false, CARAT_SCALE); // 999_999_999_999

/// Decimal places kept for prices, matching `NUMERIC(14, 2)`.
pub const PRICE_SCALE: u32 = 2;

/// Largest price per carat that can be stored.
pub const MAX_PRICE: Decimal = Decimal::from_parts(0x107a3fff, 0x5af3, 0, false, PRICE_SCALE); // 99_999_999_999_999

/// Position of a parcel in the depth-1 hierarchy.
///
/// A child always points at a parent; a child can never be a parent, so
/// grandchildren are unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParcelKind {
    Parent,
    Child { parent_id: ParcelId },
}

/// A named batch of diamond stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    pub parcel_id: ParcelId,
    pub kind: ParcelKind,
    pub name: String,
    pub shape: String,
    pub color: String,
    pub clarity: String,
    pub cut: Option<String>,
    pub sieve_size: Option<String>,
    pub description: Option<String>,
    pub total_carat: Decimal,
    pub number_of_stones: u32,
    pub price_per_ct: Decimal,
    pub ws_price_per_ct: Option<Decimal>,
    pub is_editable: bool,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Parcel {
    pub fn is_parent(&self) -> bool {
        matches!(self.kind, ParcelKind::Parent)
    }

    /// Returns the parent's ID for a child parcel.
    pub fn parent_parcel_id(&self) -> Option<&ParcelId> {
        match &self.kind {
            ParcelKind::Parent => None,
            ParcelKind::Child { parent_id } => Some(parent_id),
        }
    }
}

/// Untyped creation input, as received from a form or an API request.
///
/// Required fields are optional here so that every missing field can be
/// reported at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewParcel {
    pub parcel_id: Option<String>,
    pub parent_parcel_id: Option<String>,
    pub name: Option<String>,
    pub shape: Option<String>,
    pub color: Option<String>,
    pub clarity: Option<String>,
    pub cut: Option<String>,
    pub sieve_size: Option<String>,
    pub description: Option<String>,
    pub total_carat: Option<Decimal>,
    pub number_of_stones: Option<i64>,
    pub price_per_ct: Option<Decimal>,
    pub ws_price_per_ct: Option<Decimal>,
    pub is_editable: Option<bool>,
    pub comments: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn non_negative(field: &str, value: Decimal) -> Result<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(InventoryError::validation(format!(
            "{field} must not be negative (got {value})"
        )));
    }
    Ok(value)
}

/// Rejects values that would lose digits or overflow the stored column.
fn bounded(field: &str, value: Decimal, scale: u32, max: Decimal) -> Result<Decimal> {
    if value.round_dp(scale) != value {
        return Err(InventoryError::validation(format!(
            "{field} allows at most {scale} decimal places (got {value})"
        )));
    }
    if value.abs() > max {
        return Err(InventoryError::validation(format!(
            "{field} must not exceed {max} (got {value})"
        )));
    }
    Ok(value)
}

/// Validates a carat weight or carat delta magnitude.
pub(crate) fn carat(field: &str, value: Decimal) -> Result<Decimal> {
    bounded(field, non_negative(field, value)?, CARAT_SCALE, MAX_CARAT)
}

fn price(field: &str, value: Decimal) -> Result<Decimal> {
    bounded(field, non_negative(field, value)?, PRICE_SCALE, MAX_PRICE)
}

impl NewParcel {
    /// Returns the requested parent, if any.
    pub fn parent_id(&self) -> Option<ParcelId> {
        non_blank(&self.parent_parcel_id).map(ParcelId::new)
    }

    /// Validates the input and builds a parcel of the given kind.
    ///
    /// Parent resolution is left to the store; this only checks the fields.
    pub fn into_parcel(self, kind: ParcelKind, now: DateTime<Utc>) -> Result<Parcel> {
        let parcel_id = non_blank(&self.parcel_id);
        let name = non_blank(&self.name);
        let shape = non_blank(&self.shape);
        let color = non_blank(&self.color);
        let clarity = non_blank(&self.clarity);

        let missing: Vec<&str> = [
            ("parcel_id", parcel_id.is_none()),
            ("name", name.is_none()),
            ("total_carat", self.total_carat.is_none()),
            ("number_of_stones", self.number_of_stones.is_none()),
            ("price_per_ct", self.price_per_ct.is_none()),
            ("color", color.is_none()),
            ("shape", shape.is_none()),
            ("clarity", clarity.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, absent)| absent.then_some(field))
        .collect();

        let (
            Some(parcel_id),
            Some(name),
            Some(shape),
            Some(color),
            Some(clarity),
            Some(total_carat),
            Some(stones),
            Some(price_per_ct),
        ) = (
            parcel_id,
            name,
            shape,
            color,
            clarity,
            self.total_carat,
            self.number_of_stones,
            self.price_per_ct,
        )
        else {
            return Err(InventoryError::validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        };

        let number_of_stones = u32::try_from(stones).map_err(|_| {
            InventoryError::validation(format!("number_of_stones out of range (got {stones})"))
        })?;
        let ws_price_per_ct = match self.ws_price_per_ct {
            Some(value) => Some(price("ws_price_per_ct", value)?),
            None => None,
        };

        Ok(Parcel {
            parcel_id: ParcelId::new(parcel_id),
            kind,
            name,
            shape,
            color,
            clarity,
            cut: non_blank(&self.cut),
            sieve_size: non_blank(&self.sieve_size),
            description: non_blank(&self.description),
            total_carat: carat("total_carat", total_carat)?,
            number_of_stones,
            price_per_ct: price("price_per_ct", price_per_ct)?,
            ws_price_per_ct,
            is_editable: self.is_editable.unwrap_or(true),
            comments: non_blank(&self.comments),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Field update for an existing parcel.
///
/// Quantities, the parcel ID and the hierarchy position are not editable
/// here; quantities change only through add/reduce. For optional text
/// fields an empty string clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParcelPatch {
    pub name: Option<String>,
    pub shape: Option<String>,
    pub color: Option<String>,
    pub clarity: Option<String>,
    pub cut: Option<String>,
    pub sieve_size: Option<String>,
    pub description: Option<String>,
    pub price_per_ct: Option<Decimal>,
    pub ws_price_per_ct: Option<Decimal>,
    pub is_editable: Option<bool>,
    pub comments: Option<String>,
}

impl ParcelPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.shape.is_none()
            && self.color.is_none()
            && self.clarity.is_none()
            && self.cut.is_none()
            && self.sieve_size.is_none()
            && self.description.is_none()
            && self.price_per_ct.is_none()
            && self.ws_price_per_ct.is_none()
            && self.is_editable.is_none()
            && self.comments.is_none()
    }

    /// Returns true if the patch only flips the `is_editable` lock.
    pub fn only_toggles_lock(&self) -> bool {
        self.is_editable.is_some()
            && Self {
                is_editable: None,
                ..self.clone()
            }
            .is_empty()
    }

    /// Applies the patch to a parcel, validating every supplied field.
    pub fn apply(&self, parcel: &mut Parcel, now: DateTime<Utc>) -> Result<()> {
        fn required(field: &str, value: &Option<String>, target: &mut String) -> Result<()> {
            if value.is_some() {
                *target = non_blank(value)
                    .ok_or_else(|| InventoryError::validation(format!("{field} cannot be blank")))?;
            }
            Ok(())
        }

        fn optional(value: &Option<String>, target: &mut Option<String>) {
            if value.is_some() {
                *target = non_blank(value);
            }
        }

        required("name", &self.name, &mut parcel.name)?;
        required("shape", &self.shape, &mut parcel.shape)?;
        required("color", &self.color, &mut parcel.color)?;
        required("clarity", &self.clarity, &mut parcel.clarity)?;
        optional(&self.cut, &mut parcel.cut);
        optional(&self.sieve_size, &mut parcel.sieve_size);
        optional(&self.description, &mut parcel.description);
        optional(&self.comments, &mut parcel.comments);

        if let Some(value) = self.price_per_ct {
            parcel.price_per_ct = price("price_per_ct", value)?;
        }
        if let Some(value) = self.ws_price_per_ct {
            parcel.ws_price_per_ct = Some(price("ws_price_per_ct", value)?);
        }
        if let Some(editable) = self.is_editable {
            parcel.is_editable = editable;
        }

        parcel.updated_at = now;
        Ok(())
    }
}
