//! File-save collaborator
//!
//! Exported snapshots leave the application through a [`FileSaver`]. Saving
//! is fire-and-forget: the export workflow hands over the file and moves on,
//! it never learns whether the bytes reached the disk.
//!
//! # Examples
//!
//! ```rust,no_run
//! use activity_snapshot::fs::{DiskFileSaver, FileSaver, SnapshotFile};
//!
//! #[tokio::main]
//! async fn main() {
//!     let saver = DiskFileSaver::new("backups");
//!     saver.save_as(SnapshotFile::json("app_backup_1.json", b"{}".to_vec()));
//!
//!     // Wait for queued writes before exiting
//!     saver.drain().await;
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

/// MIME type attached to every exported snapshot.
pub const SNAPSHOT_MIME_TYPE: &str = "text/plain;charset=utf-8";

/// A file ready to be handed to the platform save mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    pub name: String,
    pub mime_type: String,
    pub contents: Vec<u8>,
}

impl SnapshotFile {
    /// A UTF-8 JSON snapshot with [`SNAPSHOT_MIME_TYPE`].
    pub fn json(name: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: SNAPSHOT_MIME_TYPE.to_string(),
            contents,
        }
    }
}

/// Trait for the save-file side effect that can be mocked in tests
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait FileSaver: Send + Sync {
    /// Dispatch `file` to be saved. Returns as soon as the save is queued.
    fn save_as(&self, file: SnapshotFile);
}

/// Saves snapshots into a directory on a background task
///
/// Write failures are logged and otherwise dropped. Handles of queued
/// writes are retained so the process can [`drain`](Self::drain) them
/// before it exits.
///
/// Writes are spawned on the current Tokio runtime. Called outside a
/// runtime, [`save_as`](FileSaver::save_as) logs an error and drops the file.
pub struct DiskFileSaver {
    output_dir: PathBuf,
    pending: Mutex<Vec<JoinHandle<()>>>,
    written: Arc<Mutex<Vec<PathBuf>>>,
}

impl DiskFileSaver {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            pending: Mutex::new(Vec::new()),
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Number of writes queued and not yet drained.
    pub fn pending_count(&self) -> usize {
        match self.pending.lock() {
            Ok(pending) => pending.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Paths of snapshots that reached the disk so far.
    pub fn written_paths(&self) -> Vec<PathBuf> {
        match self.written.lock() {
            Ok(written) => written.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Wait for every queued write to finish.
    pub async fn drain(&self) {
        let handles = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Snapshot write task did not complete: {}", e);
            }
        }
    }
}

impl FileSaver for DiskFileSaver {
    fn save_as(&self, file: SnapshotFile) {
        let target = self.output_dir.join(&file.name);
        debug!(
            file = %file.name,
            mime_type = %file.mime_type,
            bytes = file.contents.len(),
            "Queueing snapshot write"
        );

        let Ok(runtime) = Handle::try_current() else {
            error!(file = %file.name, "No Tokio runtime to save snapshot on, dropping it");
            return;
        };

        let dir = self.output_dir.clone();
        let written = Arc::clone(&self.written);
        let handle = runtime.spawn(async move {
            if let Err(e) = tokio::fs::create_dir_all(&dir).await {
                error!(dir = %dir.display(), "Failed to create output directory: {}", e);
                return;
            }
            match tokio::fs::write(&target, &file.contents).await {
                Ok(()) => {
                    info!(path = %target.display(), "Snapshot saved");
                    match written.lock() {
                        Ok(mut written) => written.push(target),
                        Err(poisoned) => poisoned.into_inner().push(target),
                    }
                }
                Err(e) => error!(path = %target.display(), "Failed to save snapshot: {}", e),
            }
        });

        match self.pending.lock() {
            Ok(mut pending) => pending.push(handle),
            Err(poisoned) => poisoned.into_inner().push(handle),
        }
    }
}
