use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{ImportMode, RecordSet, RecordStore, StoreError, StoreProvider};

/// Record store backed by a single JSON document on disk.
pub struct JsonFileStore {
    path: PathBuf,
    mode: ImportMode,
    // Serializes read-modify-write cycles on the data file.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, mode: ImportMode) -> Self {
        Self {
            path: path.into(),
            mode,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> ImportMode {
        self.mode
    }

    async fn read_current(&self) -> Result<RecordSet, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Data file missing, treating as empty");
                Ok(RecordSet::empty())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write through a sibling temp file so readers never see a torn document.
    async fn write_atomic(&self, records: &RecordSet) -> Result<(), StoreError> {
        let contents = serde_json::to_vec_pretty(records)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents).await?;
        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn export_records(&self) -> Result<RecordSet, StoreError> {
        let _guard = self.write_lock.lock().await;
        self.read_current().await
    }

    async fn import_records(&self, data: RecordSet) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let next = match self.mode {
            ImportMode::Replace => data,
            ImportMode::Merge => {
                let mut current = self.read_current().await?;
                current.merge(data);
                current
            }
        };

        self.write_atomic(&next).await?;
        info!(
            path = %self.path.display(),
            mode = ?self.mode,
            records = next.record_count(),
            "Records imported"
        );
        Ok(())
    }
}

/// Provider for a [`JsonFileStore`].
///
/// The store is created once and shared by every acquisition so that all
/// workflows go through the same write lock.
pub struct JsonFileStoreProvider {
    store: Arc<JsonFileStore>,
}

impl JsonFileStoreProvider {
    pub fn new(path: impl Into<PathBuf>, mode: ImportMode) -> Self {
        Self {
            store: Arc::new(JsonFileStore::new(path, mode)),
        }
    }

    pub fn store(&self) -> Arc<JsonFileStore> {
        Arc::clone(&self.store)
    }
}

#[async_trait]
impl StoreProvider for JsonFileStoreProvider {
    async fn acquire(&self) -> Result<Arc<dyn RecordStore>, StoreError> {
        let dir = match self.store.path().parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        match fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(self.store.clone() as Arc<dyn RecordStore>),
            Ok(_) => Err(StoreError::Unavailable {
                reason: format!("{} is not a directory", dir.display()),
            }),
            Err(e) => Err(StoreError::Unavailable {
                reason: format!("data directory {} is not accessible: {e}", dir.display()),
            }),
        }
    }
}
