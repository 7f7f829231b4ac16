//! Persistence collaborator contract
//!
//! The migration workflows never look inside the records they move. A
//! `RecordStore` hands out the complete dataset as a [`RecordSet`] and accepts
//! one back; whether an import replaces or merges is the store's decision,
//! expressed through [`ImportMode`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

pub mod json_store;

pub use json_store::{JsonFileStore, JsonFileStoreProvider};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored records are not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Import rejected: {reason}")]
    Rejected { reason: String },
}

/// Full snapshot of every persisted record.
///
/// Kept as an opaque JSON document so that any schema the store uses
/// survives an export/import round trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSet(Value);

impl RecordSet {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// An empty store: `{}`.
    pub fn empty() -> Self {
        Self(Value::Object(Default::default()))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Number of top-level entries; arrays count their items, objects
    /// count the items of their array-valued fields.
    pub fn record_count(&self) -> usize {
        match &self.0 {
            Value::Array(items) => items.len(),
            Value::Object(map) => map
                .values()
                .map(|v| match v {
                    Value::Array(items) => items.len(),
                    _ => 0,
                })
                .sum(),
            _ => 0,
        }
    }

    /// Merge `incoming` into this set.
    ///
    /// Objects merge key by key: arrays under the same key are appended,
    /// any other incoming value replaces the stored one. Two top-level
    /// arrays are concatenated. Any other pairing replaces this set.
    pub fn merge(&mut self, incoming: RecordSet) {
        match (&mut self.0, incoming.0) {
            (Value::Object(existing), Value::Object(incoming)) => {
                for (key, value) in incoming {
                    match (existing.get_mut(&key), value) {
                        (Some(Value::Array(stored)), Value::Array(added)) => stored.extend(added),
                        (_, value) => {
                            existing.insert(key, value);
                        }
                    }
                }
            }
            (Value::Array(stored), Value::Array(added)) => stored.extend(added),
            (slot, incoming) => *slot = incoming,
        }
    }
}

impl Default for RecordSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Value> for RecordSet {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// How an imported snapshot is combined with the records already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Discard stored records and keep only the imported ones.
    #[default]
    Replace,
    /// Keep stored records and merge the imported ones in.
    Merge,
}

/// Bulk access to the persisted dataset.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Return the complete current dataset.
    async fn export_records(&self) -> Result<RecordSet, StoreError>;

    /// Store `data`, replacing or merging according to the store's mode.
    async fn import_records(&self, data: RecordSet) -> Result<(), StoreError>;
}

/// Hands out a connected [`RecordStore`].
///
/// Acquisition is a separate step because the store may be unavailable
/// (missing data directory, closed connection); the workflows treat that as
/// an initialization failure before any transfer is attempted.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait StoreProvider: Send + Sync {
    async fn acquire(&self) -> Result<Arc<dyn RecordStore>, StoreError>;
}
