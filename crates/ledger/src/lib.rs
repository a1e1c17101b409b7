pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod store;

pub use common::{ParcelId, UserId};
pub use error::{LedgerError, Result};
pub use memory::InMemoryLedger;
pub use postgres::PostgresLedger;
pub use query::LedgerQuery;
pub use record::{MovementId, MovementKind, MovementRecord, MovementRecordBuilder};
pub use store::{Ledger, LedgerExt};
