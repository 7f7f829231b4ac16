// Data Migration - export/import of the full record set as one JSON snapshot
//
// Workflows drive a per-direction lifecycle through an event bus; the store
// holds the resulting state for presentation code to read.

pub mod error;
pub mod events;
pub mod lifecycle;
pub mod orchestrator;
pub mod state;

pub use error::MigrationError;
pub use events::{ActivityReloadListener, EventBus, MigrationEvent, MigrationListener};
pub use lifecycle::{Direction, TransferEvent, TransferLifecycle};
pub use orchestrator::{backup_file_name, ExportSettings, MigrationService, TransferOutcome};
pub use state::{MigrationState, MigrationStore};
