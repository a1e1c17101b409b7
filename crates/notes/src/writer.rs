//! Verified status note writes.
//!
//! An external notifier acts on the presence of a note with a given status,
//! so a write only counts once the note can be read back by ID and found by
//! the notifier's own status query.

use std::time::Duration;

use common::{Clock, OrderId, SystemClock};

use crate::retry::{Poller, RetryError, RetryPolicy, RetryingWriter};
use crate::{
    AlertSink, IdentityProvider, NoteError, NoteId, NoteStore, OperatorAlert, Result, StatusNote,
};

/// Retry and verification budgets for [`StatusNoteWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    /// Outer write-and-verify loop.
    pub retry: RetryPolicy,
    /// Read-back by note ID.
    pub read_back: Poller,
    /// Query by order and status.
    pub status_query: Poller,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            read_back: Poller::new(3, Duration::from_millis(300)),
            status_query: Poller::new(3, Duration::from_millis(500)),
        }
    }
}

/// Records status notes and confirms they are visible before returning.
pub struct StatusNoteWriter<S, A, C = SystemClock>
where
    S: NoteStore,
    A: AlertSink,
    C: Clock + Clone,
{
    store: S,
    alerts: A,
    clock: C,
    config: WriterConfig,
}

impl<S: NoteStore, A: AlertSink> StatusNoteWriter<S, A> {
    pub fn new(store: S, alerts: A, config: WriterConfig) -> Self {
        Self::with_clock(store, alerts, config, SystemClock)
    }
}

impl<S, A, C> StatusNoteWriter<S, A, C>
where
    S: NoteStore,
    A: AlertSink,
    C: Clock + Clone,
{
    pub fn with_clock(store: S, alerts: A, config: WriterConfig, clock: C) -> Self {
        Self {
            store,
            alerts,
            clock,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn alerts(&self) -> &A {
        &self.alerts
    }

    /// Writes a status note for an order and verifies it.
    ///
    /// Malformed input and a missing identity fail immediately. Storage
    /// failures and unconfirmed reads are retried; if the budget runs out
    /// an operator alert is raised and `VerificationTimeout` is returned.
    #[tracing::instrument(skip(self, identity, note), fields(note_id))]
    pub async fn record(
        &self,
        identity: &impl IdentityProvider,
        order_id: &str,
        status: &str,
        note: &str,
    ) -> Result<StatusNote> {
        let order_id = OrderId::parse(order_id)
            .map_err(|e| NoteError::Validation(format!("invalid order id {order_id:?}: {e}")))?;
        let status = status.trim();
        if status.is_empty() {
            return Err(NoteError::Validation("status must not be blank".to_string()));
        }
        let created_by = identity
            .current_user()
            .await
            .ok_or_else(|| NoteError::Auth("no signed-in user".to_string()))?;

        // The ID is fixed before the first attempt so retries cannot duplicate
        let note = StatusNote {
            id: NoteId::new(),
            order_id,
            status: status.to_string(),
            note: note.to_string(),
            created_by,
            created_at: self.clock.now(),
        };
        tracing::Span::current().record("note_id", tracing::field::display(note.id));

        let writer = RetryingWriter::new(self.config.retry, self.clock.clone());
        let outcome = writer
            .execute(
                |attempt| {
                    metrics::counter!("status_note_attempts_total").increment(1);
                    self.write(&note, attempt)
                },
                |_| self.verify(&note),
            )
            .await;

        match outcome {
            Ok(attempts) => {
                tracing::info!(order_id = %order_id, attempts, "status note verified");
                Ok(note)
            }
            Err(RetryError::Fatal(e)) => Err(e),
            Err(RetryError::Exhausted {
                attempts,
                last_error,
            }) => {
                metrics::counter!("status_note_verification_timeouts_total").increment(1);
                let last_error = last_error.to_string();
                self.alerts
                    .raise(OperatorAlert {
                        order_id,
                        note_id: note.id,
                        status: note.status.clone(),
                        attempts,
                        message: format!(
                            "status note for order {order_id} was not confirmed; check it exists before notifying the customer ({last_error})"
                        ),
                        raised_at: self.clock.now(),
                    })
                    .await;

                Err(NoteError::VerificationTimeout {
                    order_id,
                    note_id: note.id,
                    attempts,
                    last_error,
                })
            }
        }
    }

    async fn write(&self, note: &StatusNote, attempt: u32) -> Result<()> {
        let inserted = self.store.insert_if_absent(note).await?;
        if !inserted {
            tracing::debug!(attempt, "note already present from an earlier attempt");
        }
        Ok(())
    }

    async fn verify(&self, note: &StatusNote) -> Result<()> {
        let read_back = self
            .config
            .read_back
            .poll(&self.clock, || self.store.get(note.id))
            .await?;
        if read_back.is_none() {
            return Err(NoteError::transient(format!(
                "note {} not readable after write",
                note.id
            )));
        }

        let listed = self
            .config
            .status_query
            .poll(&self.clock, || async move {
                let notes = self.store.find_by_status(note.order_id, &note.status).await?;
                Ok::<_, NoteError>(notes.into_iter().find(|n| n.id == note.id))
            })
            .await?;
        if listed.is_none() {
            return Err(NoteError::transient(format!(
                "note {} missing from status query {:?}",
                note.id, note.status
            )));
        }

        Ok(())
    }

    /// Looks up a stored note by ID.
    pub async fn get(&self, id: NoteId) -> Result<StatusNote> {
        self.store.get(id).await?.ok_or(NoteError::NotFound(id))
    }
}
