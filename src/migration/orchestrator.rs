use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn, Instrument};

use super::error::MigrationError;
use super::events::{EventBus, MigrationEvent};
use super::lifecycle::Direction;
use super::state::MigrationStore;
use crate::fs::{FileSaver, SnapshotFile};
use crate::storage::{RecordSet, StoreProvider};
use crate::telemetry::{create_migration_span, generate_correlation_id};

/// How one workflow invocation ended.
///
/// Only a tag: the error itself is surfaced through the [`MigrationStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Succeeded,
    Failed,
    /// Another attempt in the same direction was still running.
    Rejected,
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Prefix of exported file names.
    pub app_name: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            app_name: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

/// `<app>_backup_<unix-millis>.json`
pub fn backup_file_name(app_name: &str, timestamp_millis: i64) -> String {
    format!("{app_name}_backup_{timestamp_millis}.json")
}

/// Runs the export and import workflows.
///
/// At most one attempt per direction is in flight; an overlapping call is
/// turned away without touching the running attempt's state.
pub struct MigrationService {
    provider: Arc<dyn StoreProvider>,
    saver: Arc<dyn FileSaver>,
    events: EventBus,
    settings: ExportSettings,
    export_guard: Mutex<()>,
    import_guard: Mutex<()>,
}

impl MigrationService {
    pub fn new(
        provider: Arc<dyn StoreProvider>,
        saver: Arc<dyn FileSaver>,
        events: EventBus,
        settings: ExportSettings,
    ) -> Self {
        Self {
            provider,
            saver,
            events,
            settings,
            export_guard: Mutex::new(()),
            import_guard: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<MigrationStore> {
        self.events.store()
    }

    /// Export every stored record to a JSON snapshot file.
    pub async fn export_records(&self) -> TransferOutcome {
        let Ok(_guard) = self.export_guard.try_lock() else {
            warn!("Export already in progress, ignoring request");
            return TransferOutcome::Rejected;
        };

        let correlation_id = generate_correlation_id();
        let span = create_migration_span(Direction::Export, &correlation_id);

        async {
            self.events.emit(MigrationEvent::ExportStarted).await;

            match self.run_export().await {
                Ok(file_name) => {
                    info!(file = %file_name, "Export dispatched");
                    self.events.emit(MigrationEvent::ExportSucceeded).await;
                    TransferOutcome::Succeeded
                }
                Err(e) => {
                    error!(kind = e.kind(), "Export failed: {}", e);
                    self.events.emit(MigrationEvent::ExportFailed(e)).await;
                    TransferOutcome::Failed
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_export(&self) -> Result<String, MigrationError> {
        let store = self
            .provider
            .acquire()
            .await
            .map_err(MigrationError::initialization)?;

        let records = store
            .export_records()
            .await
            .map_err(MigrationError::transfer)?;

        let contents = serde_json::to_vec(&records).map_err(MigrationError::serialization)?;
        let file_name = backup_file_name(&self.settings.app_name, Utc::now().timestamp_millis());

        self.saver.save_as(SnapshotFile::json(file_name.clone(), contents));
        Ok(file_name)
    }

    /// Replace or merge the stored records with the snapshot in `raw_text`.
    ///
    /// On success the activity subsystem is told to reload in the same step
    /// that marks the import as succeeded.
    pub async fn import_records(&self, raw_text: &str) -> TransferOutcome {
        let Ok(_guard) = self.import_guard.try_lock() else {
            warn!("Import already in progress, ignoring request");
            return TransferOutcome::Rejected;
        };

        let correlation_id = generate_correlation_id();
        let span = create_migration_span(Direction::Import, &correlation_id);

        async {
            self.events.emit(MigrationEvent::ImportStarted).await;

            match self.run_import(raw_text).await {
                Ok(records) => {
                    info!(records, "Import completed");
                    self.events.emit(MigrationEvent::ImportCompleted).await;
                    TransferOutcome::Succeeded
                }
                Err(e) => {
                    error!(kind = e.kind(), "Import failed: {}", e);
                    self.events.emit(MigrationEvent::ImportFailed(e)).await;
                    TransferOutcome::Failed
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_import(&self, raw_text: &str) -> Result<usize, MigrationError> {
        let store = self
            .provider
            .acquire()
            .await
            .map_err(MigrationError::initialization)?;

        let data: RecordSet = serde_json::from_str(raw_text).map_err(MigrationError::format)?;
        let count = data.record_count();

        store
            .import_records(data)
            .await
            .map_err(MigrationError::transfer)?;

        Ok(count)
    }
}
