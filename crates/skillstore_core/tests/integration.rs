//! End-to-end tests of the dataset engine against real directories.

use proptest::prelude::*;
use skillstore_core::{
    catalog, BaseRecord, Config, CoreError, DatasetName, ImportOptions, LearningPlan,
    ProgressEntry, Store, TransactionOptions, User,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

fn open(dir: &Path) -> Store {
    Store::open(
        Config::new()
            .data_dir(dir)
            .auto_daily_backup(false)
            .lock_retry_delay(Duration::from_millis(2))
            .max_lock_retries(5_000),
    )
}

fn add_user(store: &Store, id: &str) {
    store
        .transaction(
            &catalog::USERS,
            |mut state| {
                state
                    .records
                    .push(User::new(BaseRecord::new(id), format!("{id}@example.com")));
                Ok(state)
            },
            &TransactionOptions::new().description("add user"),
        )
        .unwrap();
}

fn add_plan(store: &Store, id: &str, user_id: &str) {
    store
        .transaction(
            &catalog::LEARNING_PLANS,
            |mut state| {
                state
                    .records
                    .push(LearningPlan::new(BaseRecord::new(id), user_id, "Rust"));
                Ok(state)
            },
            &TransactionOptions::new(),
        )
        .unwrap();
}

fn seed(store: &Store) {
    store.init().unwrap();
    add_user(store, "u-1");
    add_user(store, "u-2");
    add_plan(store, "p-1", "u-1");
}

#[test]
fn failed_mutator_leaves_dataset_byte_identical() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());
    seed(&store);
    let path = store.dir().records_path(DatasetName::Users);
    let before = fs::read(&path).unwrap();

    let result = store.transaction(
        &catalog::USERS,
        |mut state| {
            state.records.push(User::new(BaseRecord::new("u-3"), "c@example.com"));
            Err(CoreError::aborted("payment declined"))
        },
        &TransactionOptions::new(),
    );

    assert!(matches!(result, Err(CoreError::Aborted { .. })));
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn duplicate_ids_are_rejected_and_nothing_changes() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());
    seed(&store);
    let before = store.read_dataset(&catalog::USERS).unwrap();

    let result = store.transaction(
        &catalog::USERS,
        |mut state| {
            state.records.push(User::new(BaseRecord::new("u-1"), "dup@example.com"));
            Ok(state)
        },
        &TransactionOptions::new(),
    );

    assert!(matches!(result, Err(CoreError::DuplicateRecordId { ref id, .. }) if id == "u-1"));
    assert_eq!(store.read_dataset(&catalog::USERS).unwrap(), before);
    assert_eq!(store.read_journal(DatasetName::Users).unwrap().len(), 2);
}

#[test]
fn concurrent_writers_lose_no_updates() {
    const WRITERS: usize = 8;

    let dir = tempdir().unwrap();
    let store = Arc::new(open(dir.path()));

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || add_user(&store, &format!("writer-{i}")))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let users = store.read_dataset(&catalog::USERS).unwrap();
    assert_eq!(users.len(), WRITERS);
    let mut ids: Vec<_> = users.records.iter().map(|u| u.base.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), WRITERS);

    assert_eq!(store.read_journal(DatasetName::Users).unwrap().len(), WRITERS);
    assert!(store.verify_journal(DatasetName::Users).unwrap().is_consistent());
}

#[test]
fn separate_handles_share_the_lock() {
    let dir = tempdir().unwrap();
    let a = open(dir.path());
    let b = open(dir.path());

    let t = thread::spawn(move || {
        for i in 0..5 {
            add_user(&a, &format!("a-{i}"));
        }
    });
    for i in 0..5 {
        add_user(&b, &format!("b-{i}"));
    }
    t.join().unwrap();

    assert_eq!(open(dir.path()).read_dataset(&catalog::USERS).unwrap().len(), 10);
}

#[test]
fn stale_lock_times_out_with_key_and_attempts() {
    let dir = tempdir().unwrap();
    let store = Store::open(
        Config::new()
            .data_dir(dir.path())
            .auto_daily_backup(false)
            .max_lock_retries(3)
            .lock_retry_delay(Duration::from_millis(1)),
    );
    let lock = store.dir().lock_path(DatasetName::Progress);
    fs::create_dir_all(lock.parent().unwrap()).unwrap();
    fs::write(&lock, b"99999 0\n").unwrap();

    let err = store
        .transaction(&catalog::PROGRESS, Ok, &TransactionOptions::new())
        .unwrap_err();

    match err {
        CoreError::Storage(skillstore_storage::StorageError::LockTimeout { key, attempts }) => {
            assert_eq!(key, "progress");
            assert_eq!(attempts, 3);
        }
        other => panic!("expected lock timeout, got {other}"),
    }
    // Another dataset is unaffected.
    add_user(&store, "u-1");
}

#[test]
fn export_import_round_trip_into_fresh_store() {
    let src_dir = tempdir().unwrap();
    let src = open(src_dir.path());
    seed(&src);
    let file = src_dir.path().join("export.json");
    src.export_to(&file).unwrap();

    let dst_dir = tempdir().unwrap();
    let dst = open(dst_dir.path());
    let summary = dst.import_from(&file, &ImportOptions::new()).unwrap();

    assert_eq!(summary.imported.len(), DatasetName::ALL.len());
    assert!(summary.backup.exists());
    for (name, state) in src.read_all().unwrap() {
        let imported = dst.read_dataset(&name.definition()).unwrap();
        assert_eq!(imported.records, state.records, "{name}");
        assert_eq!(imported.schema_version, state.schema_version, "{name}");
    }
    assert!(!dst.validate().has_errors);

    // Typed commits continue the chain the untyped import started.
    add_user(&dst, "u-3");
    add_plan(&dst, "p-2", "u-3");
    for name in DatasetName::ALL {
        assert!(dst.verify_journal(name).unwrap().is_consistent(), "{name}");
    }
}

#[test]
fn failed_import_restores_every_dataset() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());
    seed(&store);
    let before = store.read_all().unwrap();
    let journal_before = store.read_journal(DatasetName::Users).unwrap();
    assert!(store.get_metadata().unwrap().last_backup_at.is_none());

    // `users` is valid and is replaced first; `progress` has no records
    // array, so its transaction fails after `users` was already written.
    let file = dir.path().join("bad.json");
    let payload = serde_json::json!({
        "exportedAt": "2024-05-01T12:00:00Z",
        "version": 1,
        "metadata": {"version": 1, "datasets": {}},
        "datasets": {
            "users": {"schemaVersion": 1, "records": [{
                "id": "intruder",
                "email": "x@x",
                "createdAt": "2024-01-01T00:00:00.000Z",
                "updatedAt": "2024-01-01T00:00:00.000Z"
            }]},
            "progress": {"schemaVersion": 1, "records": "oops"}
        }
    });
    fs::write(&file, serde_json::to_vec(&payload).unwrap()).unwrap();

    let err = store.import_from(&file, &ImportOptions::new()).unwrap_err();
    match &err {
        CoreError::ImportFailed { source, backup } => {
            assert!(matches!(**source, CoreError::InvalidState { dataset: DatasetName::Progress, .. }));
            assert!(backup.exists());
        }
        other => panic!("expected import failure, got {other}"),
    }

    assert_eq!(store.read_all().unwrap(), before);
    assert_eq!(store.read_journal(DatasetName::Users).unwrap(), journal_before);
    assert!(store.get_metadata().unwrap().entry(DatasetName::Users).is_some());
    // The restored metadata still knows about the pre-import backup.
    assert!(store.get_metadata().unwrap().last_backup_at.is_some());
    assert!(store.ensure_daily_backup().unwrap().is_none());
}

#[test]
fn dangling_plan_reference_is_one_error() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());
    seed(&store);

    store
        .transaction(
            &catalog::PROGRESS,
            |mut state| {
                state
                    .records
                    .push(ProgressEntry::new(BaseRecord::new("pr-1"), "u-1", "p-missing"));
                Ok(state)
            },
            &TransactionOptions::new(),
        )
        .unwrap();

    let report = store.validate();
    assert!(report.has_errors);
    assert_eq!(report.error_count(), 1);
    let issue = report.issues_at(skillstore_core::IssueLevel::Error).next().unwrap();
    assert_eq!(issue.dataset, "progress");
    assert_eq!(issue.record_ids, vec!["pr-1".to_string()]);
}

#[test]
fn daily_backup_is_taken_once_per_day() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());
    store.init().unwrap();

    let first = store.ensure_daily_backup().unwrap();
    let second = store.ensure_daily_backup().unwrap();

    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(store.list_backups().unwrap().len(), 1);
}

#[test]
fn init_with_daily_backup_enabled_is_idempotent() {
    let dir = tempdir().unwrap();
    let store = Store::open(Config::new().data_dir(dir.path()));

    store.init().unwrap();
    store.init().unwrap();

    let backups = store.list_backups().unwrap();
    assert_eq!(backups.len(), 1);
    assert_eq!(backups[0].label.as_deref(), Some("daily"));
}

#[test]
fn journal_lag_after_out_of_band_write_is_reported() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());
    seed(&store);

    // Simulate a crash between the dataset write and the journal append.
    let path = store.dir().records_path(DatasetName::Users);
    let mut state: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    state["records"].as_array_mut().unwrap().pop();
    fs::write(&path, serde_json::to_vec(&state).unwrap()).unwrap();

    let report = store.verify_journal(DatasetName::Users).unwrap();
    assert!(report.breaks.is_empty());
    assert!(report.lagging);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn any_unique_id_set_commits_and_reads_back(ids in prop::collection::btree_set("[a-z0-9]{1,12}", 0..20)) {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let ids: Vec<String> = ids.into_iter().collect();

        store
            .transaction(
                &catalog::USERS,
                |mut state| {
                    state.records = ids
                        .iter()
                        .map(|id| User::new(BaseRecord::new(id.clone()), format!("{id}@x")))
                        .collect();
                    Ok(state)
                },
                &TransactionOptions::new(),
            )
            .unwrap();

        let read: Vec<String> = store
            .read_dataset(&catalog::USERS)
            .unwrap()
            .records
            .into_iter()
            .map(|u| u.base.id)
            .collect();
        prop_assert_eq!(read, ids);
    }
}
