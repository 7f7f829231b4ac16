use serde::{Serialize, Serializer};
use statig::prelude::*;
use tokio::sync::{watch, Mutex};

use super::error::MigrationError;
use super::lifecycle::{Direction, TransferEvent, TransferLifecycle};

/// Point-in-time view of both migration directions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationState {
    pub is_exporting_records: bool,
    #[serde(serialize_with = "serialize_error")]
    pub export_error: Option<MigrationError>,
    pub export_succeeded: bool,
    pub is_importing_records: bool,
    #[serde(serialize_with = "serialize_error")]
    pub import_error: Option<MigrationError>,
    pub import_succeeded: bool,
}

fn serialize_error<S: Serializer>(
    error: &Option<MigrationError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

struct Directions {
    export: StateMachine<TransferLifecycle>,
    import: StateMachine<TransferLifecycle>,
}

impl Directions {
    fn new() -> Self {
        Self {
            export: TransferLifecycle::new(Direction::Export).state_machine(),
            import: TransferLifecycle::new(Direction::Import).state_machine(),
        }
    }

    fn lifecycle_mut(&mut self, direction: Direction) -> &mut StateMachine<TransferLifecycle> {
        match direction {
            Direction::Export => &mut self.export,
            Direction::Import => &mut self.import,
        }
    }

    fn snapshot(&self) -> MigrationState {
        let export = self.export.inner();
        let import = self.import.inner();
        MigrationState {
            is_exporting_records: export.in_progress(),
            export_error: export.error().cloned(),
            export_succeeded: export.succeeded(),
            is_importing_records: import.in_progress(),
            import_error: import.error().cloned(),
            import_succeeded: import.succeeded(),
        }
    }
}

/// Owner of the migration state.
///
/// Constructed once by the composition root and shared by `Arc`. Every
/// transition is applied under one lock, so readers always observe a state
/// produced by a complete transition.
pub struct MigrationStore {
    inner: Mutex<Directions>,
    published: watch::Sender<MigrationState>,
}

impl MigrationStore {
    pub fn new() -> Self {
        let (published, _) = watch::channel(MigrationState::default());
        Self {
            inner: Mutex::new(Directions::new()),
            published,
        }
    }

    /// Apply one transition and return the resulting state.
    pub async fn apply(&self, direction: Direction, event: &TransferEvent) -> MigrationState {
        self.apply_then(direction, event, |_| {}).await
    }

    /// Apply one transition and run `after` before any reader can observe
    /// the new state.
    pub(crate) async fn apply_then<F>(
        &self,
        direction: Direction,
        event: &TransferEvent,
        after: F,
    ) -> MigrationState
    where
        F: FnOnce(&MigrationState),
    {
        let mut inner = self.inner.lock().await;
        inner.lifecycle_mut(direction).handle(event);
        let state = inner.snapshot();
        after(&state);
        self.published.send_replace(state.clone());
        state
    }

    pub async fn begin_export(&self) -> MigrationState {
        self.apply(Direction::Export, &TransferEvent::Begin).await
    }

    pub async fn fail_export(&self, error: MigrationError) -> MigrationState {
        self.apply(Direction::Export, &TransferEvent::Fail(error)).await
    }

    pub async fn succeed_export(&self) -> MigrationState {
        self.apply(Direction::Export, &TransferEvent::Succeed).await
    }

    pub async fn begin_import(&self) -> MigrationState {
        self.apply(Direction::Import, &TransferEvent::Begin).await
    }

    pub async fn fail_import(&self, error: MigrationError) -> MigrationState {
        self.apply(Direction::Import, &TransferEvent::Fail(error)).await
    }

    pub async fn succeed_import(&self) -> MigrationState {
        self.apply(Direction::Import, &TransferEvent::Succeed).await
    }

    pub async fn snapshot(&self) -> MigrationState {
        self.inner.lock().await.snapshot()
    }

    pub async fn is_exporting(&self) -> bool {
        self.inner.lock().await.export.inner().in_progress()
    }

    pub async fn export_error(&self) -> Option<MigrationError> {
        self.inner.lock().await.export.inner().error().cloned()
    }

    pub async fn export_succeeded(&self) -> bool {
        self.inner.lock().await.export.inner().succeeded()
    }

    pub async fn is_importing(&self) -> bool {
        self.inner.lock().await.import.inner().in_progress()
    }

    pub async fn import_error(&self) -> Option<MigrationError> {
        self.inner.lock().await.import.inner().error().cloned()
    }

    pub async fn import_succeeded(&self) -> bool {
        self.inner.lock().await.import.inner().succeeded()
    }

    /// Receiver that yields every state published after a transition.
    pub fn subscribe(&self) -> watch::Receiver<MigrationState> {
        self.published.subscribe()
    }
}

impl Default for MigrationStore {
    fn default() -> Self {
        Self::new()
    }
}
