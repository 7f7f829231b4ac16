// Activity Snapshot Library - export/import of the activity record store
// This exposes the core components for testing and integration

pub mod activity;
pub mod app;
pub mod config;
pub mod fs;
pub mod migration;
pub mod shutdown;
pub mod storage;
pub mod telemetry;

// Re-export key types for easy access
pub use activity::{ActivityService, LoadOptions, ReloadSignal};
pub use app::{App, ExportReport, ImportReport};
pub use config::SnapshotConfig;
pub use fs::{DiskFileSaver, FileSaver, SnapshotFile, SNAPSHOT_MIME_TYPE};
pub use migration::{
    Direction, EventBus, ExportSettings, MigrationError, MigrationEvent, MigrationService,
    MigrationState, MigrationStore, TransferOutcome,
};
pub use shutdown::ShutdownCoordinator;
pub use storage::{ImportMode, JsonFileStoreProvider, RecordSet, RecordStore, StoreError, StoreProvider};
pub use telemetry::{create_migration_span, generate_correlation_id, init_telemetry};
