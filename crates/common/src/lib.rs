//! Shared identifiers and time source used across the stock ledger crates.

pub mod clock;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use types::{OrderId, ParcelId, UserId};
