use std::sync::Arc;
use thiserror::Error;

use crate::storage::StoreError;

/// Failure of an export or import workflow.
///
/// Errors are stored in the migration state and read by any number of
/// observers, so sources are shared behind `Arc` to keep the type `Clone`.
#[derive(Debug, Clone, Error)]
pub enum MigrationError {
    /// The persistence collaborator could not be acquired.
    #[error("Unable to initialize DB connection")]
    Initialization {
        #[source]
        source: Arc<StoreError>,
    },

    /// The bulk export or import call itself failed.
    #[error("Record transfer failed: {source}")]
    Transfer {
        #[source]
        source: Arc<StoreError>,
    },

    /// Import text is not JSON.
    #[error("Snapshot is not valid JSON: {source}")]
    Format {
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// Exported records could not be rendered as JSON.
    #[error("Unable to serialize records: {source}")]
    Serialization {
        #[source]
        source: Arc<serde_json::Error>,
    },
}

impl MigrationError {
    pub fn initialization(source: StoreError) -> Self {
        MigrationError::Initialization {
            source: Arc::new(source),
        }
    }

    pub fn transfer(source: StoreError) -> Self {
        MigrationError::Transfer {
            source: Arc::new(source),
        }
    }

    pub fn format(source: serde_json::Error) -> Self {
        MigrationError::Format {
            source: Arc::new(source),
        }
    }

    pub fn serialization(source: serde_json::Error) -> Self {
        MigrationError::Serialization {
            source: Arc::new(source),
        }
    }

    /// Short machine-readable tag, used in logs and status output.
    pub fn kind(&self) -> &'static str {
        match self {
            MigrationError::Initialization { .. } => "initialization",
            MigrationError::Transfer { .. } => "transfer",
            MigrationError::Format { .. } => "format",
            MigrationError::Serialization { .. } => "serialization",
        }
    }
}
