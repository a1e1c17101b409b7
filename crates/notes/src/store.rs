use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;

use crate::{NoteId, Result, StatusNote};

/// Storage for order status notes.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Inserts the note unless one with the same ID exists.
    ///
    /// Returns `false` when the note was already present.
    async fn insert_if_absent(&self, note: &StatusNote) -> Result<bool>;

    /// Reads a note back by its ID.
    async fn get(&self, id: NoteId) -> Result<Option<StatusNote>>;

    /// Lists an order's notes with the given status, oldest first.
    async fn find_by_status(&self, order_id: OrderId, status: &str) -> Result<Vec<StatusNote>>;
}

#[async_trait]
impl<T: NoteStore + ?Sized> NoteStore for Arc<T> {
    async fn insert_if_absent(&self, note: &StatusNote) -> Result<bool> {
        (**self).insert_if_absent(note).await
    }

    async fn get(&self, id: NoteId) -> Result<Option<StatusNote>> {
        (**self).get(id).await
    }

    async fn find_by_status(&self, order_id: OrderId, status: &str) -> Result<Vec<StatusNote>> {
        (**self).find_by_status(order_id, status).await
    }
}
