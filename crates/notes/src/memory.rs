use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use tokio::sync::RwLock;

use crate::{NoteError, NoteId, NoteStore, Result, StatusNote};

#[derive(Debug, Default)]
struct Faults {
    failed_inserts: u32,
    lost_acks: u32,
    hidden_reads: u32,
    hidden_queries: u32,
    drop_writes: bool,
}

fn take(counter: &mut u32) -> bool {
    if *counter > 0 {
        *counter -= 1;
        true
    } else {
        false
    }
}

#[derive(Debug, Default)]
struct State {
    notes: Vec<StatusNote>,
    faults: Faults,
}

/// In-memory note store for testing and database-less runs.
///
/// Faults can be injected to simulate storage errors and read-after-write
/// lag.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNoteStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` inserts fail without writing.
    pub async fn fail_next_inserts(&self, n: u32) {
        self.state.write().await.faults.failed_inserts = n;
    }

    /// Makes the next `n` inserts write the note but report a failure.
    pub async fn lose_next_acks(&self, n: u32) {
        self.state.write().await.faults.lost_acks = n;
    }

    /// Makes the next `n` reads by ID miss.
    pub async fn hide_next_reads(&self, n: u32) {
        self.state.write().await.faults.hidden_reads = n;
    }

    /// Makes the next `n` status queries come back empty.
    pub async fn hide_next_queries(&self, n: u32) {
        self.state.write().await.faults.hidden_queries = n;
    }

    /// While set, inserts report success but store nothing.
    pub async fn drop_writes(&self, drop: bool) {
        self.state.write().await.faults.drop_writes = drop;
    }

    /// Returns every stored note in insertion order.
    pub async fn all(&self) -> Vec<StatusNote> {
        self.state.read().await.notes.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.notes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.notes.is_empty()
    }
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn insert_if_absent(&self, note: &StatusNote) -> Result<bool> {
        let mut state = self.state.write().await;

        if take(&mut state.faults.failed_inserts) {
            return Err(NoteError::transient("simulated insert failure"));
        }
        if state.faults.drop_writes {
            return Ok(true);
        }

        let inserted = !state.notes.iter().any(|n| n.id == note.id);
        if inserted {
            state.notes.push(note.clone());
        }

        if take(&mut state.faults.lost_acks) {
            return Err(NoteError::transient("simulated lost acknowledgement"));
        }
        Ok(inserted)
    }

    async fn get(&self, id: NoteId) -> Result<Option<StatusNote>> {
        let mut state = self.state.write().await;
        if take(&mut state.faults.hidden_reads) {
            return Ok(None);
        }
        Ok(state.notes.iter().find(|n| n.id == id).cloned())
    }

    async fn find_by_status(&self, order_id: OrderId, status: &str) -> Result<Vec<StatusNote>> {
        let mut state = self.state.write().await;
        if take(&mut state.faults.hidden_queries) {
            return Ok(Vec::new());
        }

        let mut notes: Vec<_> = state
            .notes
            .iter()
            .filter(|n| n.order_id == order_id && n.status == status)
            .cloned()
            .collect();
        notes.sort_by_key(|n| n.created_at);
        Ok(notes)
    }
}
