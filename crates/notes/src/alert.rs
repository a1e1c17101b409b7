//! Operator-facing alerts for notes that could not be verified.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{NoteId, Result};

/// A failure that needs a human, since nothing retries it automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorAlert {
    pub order_id: OrderId,
    pub note_id: NoteId,
    pub status: String,
    pub attempts: u32,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

/// Destination for operator alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Records an alert. Sinks that cannot store it still log it.
    async fn raise(&self, alert: OperatorAlert);

    /// Returns every alert raised so far, oldest first.
    async fn alerts(&self) -> Result<Vec<OperatorAlert>>;

    async fn count(&self) -> Result<usize>;
}

#[async_trait]
impl<T: AlertSink + ?Sized> AlertSink for Arc<T> {
    async fn raise(&self, alert: OperatorAlert) {
        (**self).raise(alert).await
    }

    async fn alerts(&self) -> Result<Vec<OperatorAlert>> {
        (**self).alerts().await
    }

    async fn count(&self) -> Result<usize> {
        (**self).count().await
    }
}

pub(crate) fn log_alert(alert: &OperatorAlert) {
    tracing::error!(
        order_id = %alert.order_id,
        note_id = %alert.note_id,
        status = %alert.status,
        attempts = alert.attempts,
        message = %alert.message,
        "operator action required: status note unverified"
    );
}

/// Logs alerts and keeps them for an operator to review.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAlertSink {
    alerts: Arc<RwLock<Vec<OperatorAlert>>>,
}

impl InMemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.alerts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.alerts.read().await.is_empty()
    }
}

#[async_trait]
impl AlertSink for InMemoryAlertSink {
    async fn raise(&self, alert: OperatorAlert) {
        log_alert(&alert);
        self.alerts.write().await.push(alert);
    }

    async fn alerts(&self) -> Result<Vec<OperatorAlert>> {
        Ok(self.alerts.read().await.clone())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.len().await)
    }
}
