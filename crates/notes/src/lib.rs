//! Durable, verified order status notes.
//!
//! An external notifier reacts to the presence of a note with a given
//! status. [`StatusNoteWriter`] writes such a note, confirms it is visible
//! to both a read by ID and the notifier's status query, retries transient
//! failures with backoff, and raises an [`OperatorAlert`] if it cannot
//! confirm the write.

pub mod alert;
pub mod error;
pub mod identity;
pub mod memory;
pub mod note;
pub mod postgres;
pub mod retry;
pub mod store;
pub mod writer;

pub use alert::{AlertSink, InMemoryAlertSink, OperatorAlert};
pub use error::{NoteError, Result};
pub use identity::{IdentityProvider, StaticIdentity};
pub use memory::InMemoryNoteStore;
pub use note::{NoteId, StatusNote};
pub use postgres::{PostgresAlertSink, PostgresNoteStore};
pub use retry::{Backoff, Poller, RetryError, RetryPolicy, Retryable, RetryingWriter};
pub use store::NoteStore;
pub use writer::{StatusNoteWriter, WriterConfig};
