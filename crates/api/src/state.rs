//! Shared application state.

use std::sync::Arc;

use analytics::{InMemorySettingsStore, PostgresSettingsStore, SettingsStore, UsageAnalytics};
use inventory::{InMemoryParcelStore, ParcelStore, PostgresParcelStore, StockService};
use ledger::{InMemoryLedger, Ledger, PostgresLedger};
use notes::{
    AlertSink, InMemoryAlertSink, InMemoryNoteStore, NoteStore, PostgresAlertSink,
    PostgresNoteStore, StatusNoteWriter, WriterConfig,
};
use sqlx::PgPool;

pub type DynParcels = Arc<dyn ParcelStore>;
pub type DynLedger = Arc<dyn Ledger>;
pub type DynAlerts = Arc<dyn AlertSink>;

/// Services shared by every handler.
///
/// Stores are held as trait objects so the same router serves both the
/// in-memory and the PostgreSQL backends.
pub struct AppState {
    pub stock: StockService<DynParcels, DynLedger>,
    pub analytics: UsageAnalytics<DynParcels, DynLedger, Arc<dyn SettingsStore>>,
    pub notes: StatusNoteWriter<Arc<dyn NoteStore>, DynAlerts>,
    pub alerts: DynAlerts,
    /// Storage backend name reported by the health check.
    pub storage: &'static str,
}

impl AppState {
    pub fn new(
        parcels: DynParcels,
        ledger: DynLedger,
        settings: Arc<dyn SettingsStore>,
        notes: Arc<dyn NoteStore>,
        alerts: DynAlerts,
        writer_config: WriterConfig,
        storage: &'static str,
    ) -> Self {
        Self {
            stock: StockService::new(parcels.clone(), ledger.clone()),
            analytics: UsageAnalytics::new(parcels, ledger, settings),
            notes: StatusNoteWriter::new(notes, alerts.clone(), writer_config),
            alerts,
            storage,
        }
    }

    /// State backed by in-memory stores.
    pub fn in_memory(writer_config: WriterConfig) -> Self {
        Self::new(
            Arc::new(InMemoryParcelStore::new()),
            Arc::new(InMemoryLedger::new()),
            Arc::new(InMemorySettingsStore::new()),
            Arc::new(InMemoryNoteStore::new()),
            Arc::new(InMemoryAlertSink::new()),
            writer_config,
            "memory",
        )
    }

    /// State backed by PostgreSQL. Migrations must already have run.
    pub fn postgres(pool: PgPool, writer_config: WriterConfig) -> Self {
        Self::new(
            Arc::new(PostgresParcelStore::new(pool.clone())),
            Arc::new(PostgresLedger::new(pool.clone())),
            Arc::new(PostgresSettingsStore::new(pool.clone())),
            Arc::new(PostgresNoteStore::new(pool.clone())),
            Arc::new(PostgresAlertSink::new(pool)),
            writer_config,
            "postgres",
        )
    }
}
