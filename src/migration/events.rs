use std::sync::Arc;
use tracing::debug;

use super::error::MigrationError;
use super::lifecycle::{Direction, TransferEvent};
use super::state::{MigrationState, MigrationStore};
use crate::activity::{ActivityService, LoadOptions};

/// Everything the workflows report. Each event is one state transition.
#[derive(Debug, Clone)]
pub enum MigrationEvent {
    ExportStarted,
    ExportFailed(MigrationError),
    ExportSucceeded,
    ImportStarted,
    ImportFailed(MigrationError),
    /// Import finished; derived data must be rebuilt.
    ImportCompleted,
}

impl MigrationEvent {
    pub fn direction(&self) -> Direction {
        match self {
            MigrationEvent::ExportStarted
            | MigrationEvent::ExportFailed(_)
            | MigrationEvent::ExportSucceeded => Direction::Export,
            MigrationEvent::ImportStarted
            | MigrationEvent::ImportFailed(_)
            | MigrationEvent::ImportCompleted => Direction::Import,
        }
    }

    fn transition(&self) -> TransferEvent {
        match self {
            MigrationEvent::ExportStarted | MigrationEvent::ImportStarted => TransferEvent::Begin,
            MigrationEvent::ExportFailed(e) | MigrationEvent::ImportFailed(e) => {
                TransferEvent::Fail(e.clone())
            }
            MigrationEvent::ExportSucceeded | MigrationEvent::ImportCompleted => {
                TransferEvent::Succeed
            }
        }
    }
}

/// Consumer of migration events.
///
/// Called with the state that already includes the event, before that state
/// becomes visible to anyone else. Implementations must not block.
pub trait MigrationListener: Send + Sync {
    fn on_event(&self, event: &MigrationEvent, state: &MigrationState);
}

/// Forwards completed imports to the activity subsystem as a forced reload.
pub struct ActivityReloadListener {
    activity: Arc<dyn ActivityService>,
}

impl ActivityReloadListener {
    pub fn new(activity: Arc<dyn ActivityService>) -> Self {
        Self { activity }
    }
}

impl MigrationListener for ActivityReloadListener {
    fn on_event(&self, event: &MigrationEvent, _state: &MigrationState) {
        if let MigrationEvent::ImportCompleted = event {
            self.activity.load_records(LoadOptions::forced());
        }
    }
}

/// Applies events to the store and fans them out to listeners as one step.
pub struct EventBus {
    store: Arc<MigrationStore>,
    listeners: Vec<Arc<dyn MigrationListener>>,
}

impl EventBus {
    pub fn new(store: Arc<MigrationStore>) -> Self {
        Self {
            store,
            listeners: Vec::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn MigrationListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn store(&self) -> &Arc<MigrationStore> {
        &self.store
    }

    pub async fn emit(&self, event: MigrationEvent) -> MigrationState {
        let direction = event.direction();
        let transition = event.transition();
        debug!(%direction, ?event, listeners = self.listeners.len(), "Emitting migration event");

        self.store
            .apply_then(direction, &transition, |state| {
                for listener in &self.listeners {
                    listener.on_event(&event, state);
                }
            })
            .await
    }
}
