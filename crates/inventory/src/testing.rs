//! Fixtures shared by the unit tests in this crate.

use chrono::Utc;
use common::UserId;
use ledger::{Ledger, MovementKind};
use rust_decimal::Decimal;

use crate::NewParcel;
use crate::store::Journal;

/// Creation input with every required field set: 10 stones, 5.0 ct.
pub(crate) fn complete_input(id: &str) -> NewParcel {
    NewParcel {
        parcel_id: Some(id.to_string()),
        name: Some("Round Brilliant 1.3mm".to_string()),
        shape: Some("Round".to_string()),
        color: Some("F-G".to_string()),
        clarity: Some("VS".to_string()),
        total_carat: Some(Decimal::new(50, 1)),
        number_of_stones: Some(10),
        price_per_ct: Some(Decimal::new(45000, 2)),
        ..Default::default()
    }
}

pub(crate) fn child_input(id: &str, parent: &str) -> NewParcel {
    NewParcel {
        parent_parcel_id: Some(parent.to_string()),
        ..complete_input(id)
    }
}

/// Journal context writing to `ledger` as a test clerk.
pub(crate) fn journal(ledger: &dyn Ledger, kind: MovementKind) -> Journal<'_> {
    Journal {
        ledger,
        kind,
        comment: None,
        actor: UserId::new("test-clerk"),
        timestamp: Utc::now(),
    }
}
