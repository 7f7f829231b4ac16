// Composition root - wires the migration subsystem to its collaborators

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::activity::ReloadSignal;
use crate::config::SnapshotConfig;
use crate::fs::DiskFileSaver;
use crate::migration::{
    ActivityReloadListener, EventBus, ExportSettings, MigrationService, MigrationState,
    MigrationStore, TransferOutcome,
};
use crate::shutdown::ShutdownCoordinator;
use crate::storage::JsonFileStoreProvider;

/// Result of one CLI-level export.
#[derive(Debug)]
pub struct ExportReport {
    pub outcome: TransferOutcome,
    pub state: MigrationState,
    pub files: Vec<PathBuf>,
}

/// Result of one CLI-level import.
#[derive(Debug)]
pub struct ImportReport {
    pub outcome: TransferOutcome,
    pub state: MigrationState,
    pub reload_generation: u64,
}

pub struct App {
    service: MigrationService,
    saver: Arc<DiskFileSaver>,
    reload: Arc<ReloadSignal>,
    drain_timeout: Duration,
}

impl App {
    pub fn from_config(config: &SnapshotConfig) -> Self {
        let store = Arc::new(MigrationStore::new());
        let reload = Arc::new(ReloadSignal::new());
        let events = EventBus::new(store)
            .with_listener(Arc::new(ActivityReloadListener::new(reload.clone())));

        let provider = Arc::new(JsonFileStoreProvider::new(
            &config.storage.data_file,
            config.storage.import_mode,
        ));
        let saver = Arc::new(DiskFileSaver::new(&config.export.output_dir));

        let service = MigrationService::new(
            provider,
            saver.clone(),
            events,
            ExportSettings {
                app_name: config.app.name.clone(),
            },
        );

        Self {
            service,
            saver,
            reload,
            drain_timeout: Duration::from_secs(config.export.drain_timeout_seconds),
        }
    }

    pub fn service(&self) -> &MigrationService {
        &self.service
    }

    pub fn reload_signal(&self) -> &Arc<ReloadSignal> {
        &self.reload
    }

    /// Run the export workflow and wait until the snapshot is on disk.
    pub async fn export(&self) -> Result<ExportReport> {
        let already_written = self.saver.written_paths().len();
        let outcome = self.service.export_records().await;

        ShutdownCoordinator::new(self.saver.clone(), self.drain_timeout)
            .shutdown()
            .await?;

        let mut files = self.saver.written_paths();
        let files = files.split_off(already_written.min(files.len()));
        if outcome == TransferOutcome::Succeeded && files.is_empty() {
            warn!(
                dir = %self.saver.output_dir().display(),
                "Export succeeded but no snapshot reached the disk"
            );
        }

        Ok(ExportReport {
            outcome,
            state: self.service.store().snapshot().await,
            files,
        })
    }

    /// Read `path` and run the import workflow on its contents.
    pub async fn import(&self, path: &Path) -> Result<ImportReport> {
        let raw_text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read snapshot file {}", path.display()))?;

        let outcome = self.service.import_records(&raw_text).await;

        Ok(ImportReport {
            outcome,
            state: self.service.store().snapshot().await,
            reload_generation: self.reload.current().generation,
        })
    }
}
