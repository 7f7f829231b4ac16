use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::fs::DiskFileSaver;

/// Graceful shutdown coordinator for Activity Snapshot
///
/// Snapshot saves are dispatched in the background; the process must not
/// exit while one is still being written.
pub struct ShutdownCoordinator {
    saver: Arc<DiskFileSaver>,
    drain_timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(saver: Arc<DiskFileSaver>, drain_timeout: Duration) -> Self {
        Self {
            saver,
            drain_timeout,
        }
    }

    /// Wait for queued snapshot writes, giving up after the drain timeout
    pub async fn shutdown(self) -> Result<()> {
        let pending = self.saver.pending_count();
        if pending == 0 {
            return Ok(());
        }

        info!(pending, "Waiting for snapshot writes to finish");
        timeout(self.drain_timeout, self.saver.drain())
            .await
            .map_err(|_| {
                warn!(
                    timeout_secs = self.drain_timeout.as_secs(),
                    "Snapshot writes still pending at shutdown"
                );
                anyhow::anyhow!("Timeout waiting for snapshot writes to finish")
            })?;

        info!("Snapshot writes finished");
        Ok(())
    }
}
