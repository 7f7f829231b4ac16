//! Activity collaborator
//!
//! The activity subsystem derives its views (usage per domain, per hour of
//! week, time range) from the stored records. After an import those views
//! are stale, so the migration subsystem asks it to reload.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Discard cached data and recompute from the store.
    pub force_reload: bool,
}

impl LoadOptions {
    pub fn forced() -> Self {
        Self { force_reload: true }
    }
}

#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait ActivityService: Send + Sync {
    /// Ask the activity subsystem to (re)load its records.
    fn load_records(&self, options: LoadOptions);
}

/// A reload request as observed by subscribers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadRequest {
    /// Incremented once per request; `0` means nothing was requested yet.
    pub generation: u64,
    pub options: LoadOptions,
}

/// [`ActivityService`] that publishes reload requests on a watch channel.
///
/// Views that depend on the stored records hold a receiver and recompute
/// whenever the generation moves.
pub struct ReloadSignal {
    sender: watch::Sender<ReloadRequest>,
}

impl ReloadSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(ReloadRequest::default());
        Self { sender }
    }

    pub fn subscribe(&self) -> watch::Receiver<ReloadRequest> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> ReloadRequest {
        *self.sender.borrow()
    }
}

impl Default for ReloadSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityService for ReloadSignal {
    fn load_records(&self, options: LoadOptions) {
        self.sender.send_modify(|request| {
            request.generation += 1;
            request.options = options;
        });
        info!(
            generation = self.current().generation,
            force_reload = options.force_reload,
            "Activity reload requested"
        );
    }
}
