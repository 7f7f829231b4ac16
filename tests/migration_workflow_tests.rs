// Migration workflow integration tests
// Exercise export/import end to end with real and gated collaborators

use activity_snapshot::migration::{ActivityReloadListener, MigrationListener};
use activity_snapshot::{
    ActivityService, EventBus, ExportSettings, FileSaver, ImportMode, JsonFileStoreProvider,
    LoadOptions, MigrationError, MigrationEvent, MigrationService, MigrationState,
    MigrationStore, RecordSet, RecordStore, ReloadSignal, SnapshotFile, StoreError,
    StoreProvider, TransferOutcome, SNAPSHOT_MIME_TYPE,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::Notify;

/// Keeps every file handed to it instead of touching the disk
#[derive(Default)]
struct CapturingSaver {
    files: Mutex<Vec<SnapshotFile>>,
}

impl CapturingSaver {
    fn files(&self) -> Vec<SnapshotFile> {
        self.files.lock().unwrap().clone()
    }
}

impl FileSaver for CapturingSaver {
    fn save_as(&self, file: SnapshotFile) {
        self.files.lock().unwrap().push(file);
    }
}

/// Store that records imports and can hold exports until released
struct GatedStore {
    records: RecordSet,
    imported: Mutex<Vec<RecordSet>>,
    entered: Notify,
    release: Notify,
    gated: bool,
}

impl GatedStore {
    fn new(records: RecordSet, gated: bool) -> Self {
        Self {
            records,
            imported: Mutex::new(Vec::new()),
            entered: Notify::new(),
            release: Notify::new(),
            gated,
        }
    }
}

#[async_trait]
impl RecordStore for GatedStore {
    async fn export_records(&self) -> Result<RecordSet, StoreError> {
        if self.gated {
            self.entered.notify_one();
            self.release.notified().await;
        }
        Ok(self.records.clone())
    }

    async fn import_records(&self, data: RecordSet) -> Result<(), StoreError> {
        self.imported.lock().unwrap().push(data);
        Ok(())
    }
}

struct FixedProvider {
    store: Arc<GatedStore>,
}

#[async_trait]
impl StoreProvider for FixedProvider {
    async fn acquire(&self) -> Result<Arc<dyn RecordStore>, StoreError> {
        Ok(self.store.clone())
    }
}

#[derive(Default)]
struct StateAtNotification {
    states: Mutex<Vec<MigrationState>>,
}

impl MigrationListener for StateAtNotification {
    fn on_event(&self, event: &MigrationEvent, state: &MigrationState) {
        if let MigrationEvent::ImportCompleted = event {
            self.states.lock().unwrap().push(state.clone());
        }
    }
}

#[derive(Default)]
struct CountingActivity {
    calls: Mutex<Vec<LoadOptions>>,
}

impl ActivityService for CountingActivity {
    fn load_records(&self, options: LoadOptions) {
        self.calls.lock().unwrap().push(options);
    }
}

fn service_with(
    provider: Arc<dyn StoreProvider>,
    saver: Arc<dyn FileSaver>,
    activity: Arc<dyn ActivityService>,
) -> MigrationService {
    let events = EventBus::new(Arc::new(MigrationStore::new()))
        .with_listener(Arc::new(ActivityReloadListener::new(activity)));
    MigrationService::new(
        provider,
        saver,
        events,
        ExportSettings {
            app_name: "web-activity".to_string(),
        },
    )
}

#[tokio::test]
async fn test_export_empty_store_scenario() {
    let store = Arc::new(GatedStore::new(RecordSet::new(json!({"records": []})), false));
    let saver = Arc::new(CapturingSaver::default());
    let svc = service_with(
        Arc::new(FixedProvider { store }),
        saver.clone(),
        Arc::new(CountingActivity::default()),
    );

    let before = chrono::Utc::now().timestamp_millis();
    assert_eq!(svc.export_records().await, TransferOutcome::Succeeded);
    let after = chrono::Utc::now().timestamp_millis();

    let files = saver.files();
    assert_eq!(files.len(), 1);
    let file = &files[0];
    assert_eq!(file.mime_type, SNAPSHOT_MIME_TYPE);

    let millis: i64 = file
        .name
        .strip_prefix("web-activity_backup_")
        .and_then(|rest| rest.strip_suffix(".json"))
        .expect("file name should follow <app>_backup_<millis>.json")
        .parse()
        .unwrap();
    assert!(millis >= before && millis <= after);

    let state = svc.store().snapshot().await;
    assert!(!state.is_exporting_records);
    assert!(state.export_error.is_none());
    assert!(state.export_succeeded);
}

#[tokio::test]
async fn test_export_then_import_round_trip() {
    let dataset = RecordSet::new(json!({
        "records": [
            {"domain": "example.com", "start": 1_700_000_000_000u64, "end": 1_700_000_060_000u64},
            {"domain": "docs.rs", "start": 1_700_000_100_000u64, "end": 1_700_000_160_000u64}
        ]
    }));
    let source = Arc::new(GatedStore::new(dataset.clone(), false));
    let saver = Arc::new(CapturingSaver::default());
    let exporter = service_with(
        Arc::new(FixedProvider { store: source }),
        saver.clone(),
        Arc::new(CountingActivity::default()),
    );
    assert_eq!(exporter.export_records().await, TransferOutcome::Succeeded);

    let raw_text = String::from_utf8(saver.files()[0].contents.clone()).unwrap();

    let target = Arc::new(GatedStore::new(RecordSet::empty(), false));
    let importer = service_with(
        Arc::new(FixedProvider {
            store: target.clone(),
        }),
        Arc::new(CapturingSaver::default()),
        Arc::new(CountingActivity::default()),
    );
    assert_eq!(importer.import_records(&raw_text).await, TransferOutcome::Succeeded);

    let imported = target.imported.lock().unwrap().clone();
    assert_eq!(imported, vec![dataset]);
}

#[tokio::test]
async fn test_file_store_round_trip_with_merge() {
    let dir = TempDir::new().unwrap();
    let data_file = dir.path().join("records.json");
    std::fs::write(&data_file, r#"{"records": [{"domain": "a.com"}]}"#).unwrap();

    let saver = Arc::new(CapturingSaver::default());
    let activity = Arc::new(ReloadSignal::new());
    let svc = service_with(
        Arc::new(JsonFileStoreProvider::new(&data_file, ImportMode::Merge)),
        saver.clone(),
        activity.clone(),
    );

    assert_eq!(svc.export_records().await, TransferOutcome::Succeeded);
    let snapshot = String::from_utf8(saver.files()[0].contents.clone()).unwrap();

    assert_eq!(svc.import_records(&snapshot).await, TransferOutcome::Succeeded);

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&data_file).unwrap()).unwrap();
    assert_eq!(
        stored,
        json!({"records": [{"domain": "a.com"}, {"domain": "a.com"}]})
    );
    assert_eq!(activity.current().generation, 1);
    assert!(activity.current().options.force_reload);
}

#[tokio::test]
async fn test_missing_data_directory_is_initialization_error() {
    let dir = TempDir::new().unwrap();
    let saver = Arc::new(CapturingSaver::default());
    let activity = Arc::new(CountingActivity::default());
    let svc = service_with(
        Arc::new(JsonFileStoreProvider::new(
            dir.path().join("gone").join("records.json"),
            ImportMode::Replace,
        )),
        saver.clone(),
        activity.clone(),
    );

    assert_eq!(svc.export_records().await, TransferOutcome::Failed);
    assert_eq!(svc.import_records("{}").await, TransferOutcome::Failed);

    assert!(saver.files().is_empty());
    assert!(activity.calls.lock().unwrap().is_empty());

    let state = svc.store().snapshot().await;
    assert!(matches!(state.export_error, Some(MigrationError::Initialization { .. })));
    assert!(matches!(state.import_error, Some(MigrationError::Initialization { .. })));
    assert!(!state.is_exporting_records);
    assert!(!state.is_importing_records);
}

#[tokio::test]
async fn test_overlapping_export_is_rejected() {
    let store = Arc::new(GatedStore::new(RecordSet::new(json!({"records": [1]})), true));
    let saver = Arc::new(CapturingSaver::default());
    let svc = service_with(
        Arc::new(FixedProvider {
            store: store.clone(),
        }),
        saver.clone(),
        Arc::new(CountingActivity::default()),
    );

    let (first, second) = tokio::join!(svc.export_records(), async {
        store.entered.notified().await;

        // The first export is parked inside the store
        assert!(svc.store().is_exporting().await);
        let second = svc.export_records().await;
        assert!(svc.store().is_exporting().await);

        store.release.notify_one();
        second
    });

    assert_eq!(first, TransferOutcome::Succeeded);
    assert_eq!(second, TransferOutcome::Rejected);
    assert_eq!(saver.files().len(), 1);
    assert!(!svc.store().is_exporting().await);
    assert!(svc.store().export_succeeded().await);
}

#[tokio::test]
async fn test_import_runs_while_export_is_in_flight() {
    let store = Arc::new(GatedStore::new(RecordSet::empty(), true));
    let svc = service_with(
        Arc::new(FixedProvider {
            store: store.clone(),
        }),
        Arc::new(CapturingSaver::default()),
        Arc::new(CountingActivity::default()),
    );

    let (export, import) = tokio::join!(svc.export_records(), async {
        store.entered.notified().await;
        let outcome = svc.import_records(r#"{"records": []}"#).await;

        let state = svc.store().snapshot().await;
        assert!(state.is_exporting_records);
        assert!(!state.is_importing_records);
        assert!(state.import_succeeded);

        store.release.notify_one();
        outcome
    });

    assert_eq!(export, TransferOutcome::Succeeded);
    assert_eq!(import, TransferOutcome::Succeeded);
}

#[tokio::test]
async fn test_reload_is_dispatched_with_visible_success() {
    let store = Arc::new(GatedStore::new(RecordSet::empty(), false));
    let activity = Arc::new(CountingActivity::default());
    let probe = Arc::new(StateAtNotification::default());

    let migration_store = Arc::new(MigrationStore::new());
    let events = EventBus::new(migration_store.clone())
        .with_listener(Arc::new(ActivityReloadListener::new(activity.clone())))
        .with_listener(probe.clone());
    let svc = MigrationService::new(
        Arc::new(FixedProvider { store }),
        Arc::new(CapturingSaver::default()),
        events,
        ExportSettings::default(),
    );

    let mut published = migration_store.subscribe();
    assert_eq!(svc.import_records(r#"[{"domain": "a.com"}]"#).await, TransferOutcome::Succeeded);

    let calls = activity.calls.lock().unwrap().clone();
    assert_eq!(calls, vec![LoadOptions { force_reload: true }]);

    let states = probe.states.lock().unwrap().clone();
    assert_eq!(states.len(), 1);
    assert!(states[0].import_succeeded);
    assert!(!states[0].is_importing_records);

    assert!(published.borrow_and_update().import_succeeded);
}

#[tokio::test]
async fn test_failed_import_keeps_error_until_next_attempt() {
    let store = Arc::new(GatedStore::new(RecordSet::empty(), false));
    let svc = service_with(
        Arc::new(FixedProvider {
            store: store.clone(),
        }),
        Arc::new(CapturingSaver::default()),
        Arc::new(CountingActivity::default()),
    );

    assert_eq!(svc.import_records("{not json").await, TransferOutcome::Failed);
    assert!(matches!(
        svc.store().import_error().await,
        Some(MigrationError::Format { .. })
    ));
    assert!(store.imported.lock().unwrap().is_empty());

    assert_eq!(svc.import_records("{}").await, TransferOutcome::Succeeded);
    assert!(svc.store().import_error().await.is_none());
    assert!(svc.store().import_succeeded().await);
}
