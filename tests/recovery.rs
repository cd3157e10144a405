//! Crash and recovery scenarios driven through the public library API.

use std::fs;

use snippet_vault::backup::{
    ManualBackupManager, Operation, RestoreCoordinator, RetentionPolicy, SnapshotImage,
    SnapshotRepository, SnapshotStatus, AFTER_IMAGE,
};
use snippet_vault::config::{Settings, VaultPaths};
use snippet_vault::models::NewSnippet;
use snippet_vault::services::SnippetService;
use snippet_vault::storage::SnippetStore;
use snippet_vault::VaultError;
use tempfile::TempDir;

struct Vault {
    paths: VaultPaths,
    snapshots: SnapshotRepository,
    backups: ManualBackupManager,
    restorer: RestoreCoordinator,
    _temp: TempDir,
}

fn create_vault() -> Vault {
    let temp = TempDir::new().unwrap();
    let paths = VaultPaths::with_base_dir(temp.path().to_path_buf());
    paths.ensure_directories().unwrap();

    let mut store = SnippetStore::open(paths.database_file()).unwrap();
    store.insert(&NewSnippet::new("Deploy", "make deploy")).unwrap();
    store.close().unwrap();

    let backups = ManualBackupManager::from_paths(&paths);
    Vault {
        snapshots: SnapshotRepository::from_paths(&paths),
        restorer: RestoreCoordinator::new(paths.database_file(), backups.clone()),
        backups,
        paths,
        _temp: temp,
    }
}

fn rename_deploy(vault: &Vault) {
    let mut store = SnippetStore::open(vault.paths.database_file()).unwrap();
    let deploy = store.list().unwrap().remove(0);
    store
        .update(deploy.id, &NewSnippet::new("Deploy prod", "make deploy ENV=prod"))
        .unwrap();
    store.close().unwrap();
}

#[test]
fn update_snapshot_restores_both_images_exactly() {
    let vault = create_vault();
    let s0 = fs::read(vault.paths.database_file()).unwrap();

    let snapshot = vault.snapshots.begin_snapshot(Operation::Update, "Deploy").unwrap();
    rename_deploy(&vault);
    let s1 = fs::read(vault.paths.database_file()).unwrap();
    let completed = vault.snapshots.complete_snapshot(&snapshot.id).unwrap();

    assert_eq!(completed.status(), SnapshotStatus::Completed);
    assert_eq!(fs::read(completed.before_path()).unwrap(), s0);
    assert_eq!(fs::read(completed.after_path().unwrap()).unwrap(), s1);

    vault
        .snapshots
        .restore(&snapshot.id, SnapshotImage::from_use_before(true), &vault.restorer, false)
        .unwrap();
    assert_eq!(fs::read(vault.paths.database_file()).unwrap(), s0);

    vault
        .snapshots
        .restore(&snapshot.id, SnapshotImage::from_use_before(false), &vault.restorer, false)
        .unwrap();
    assert_eq!(fs::read(vault.paths.database_file()).unwrap(), s1);
}

#[test]
fn crash_between_begin_and_complete_leaves_pending_snapshot() {
    let vault = create_vault();
    let s0 = fs::read(vault.paths.database_file()).unwrap();

    let snapshot = vault.snapshots.begin_snapshot(Operation::Delete, "Deploy").unwrap();
    // The process dies here: no mutation result, no completion.
    drop(snapshot);

    let reloaded = SnapshotRepository::from_paths(&vault.paths);
    let pending = reloaded.list_all().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status(), SnapshotStatus::Pending);
    assert_eq!(fs::read(pending[0].before_path()).unwrap(), s0);
    assert!(pending[0].after_path().is_none());
    assert!(!pending[0].dir().join(AFTER_IMAGE).exists());

    // The before-image is still a usable recovery point
    reloaded
        .restore(&pending[0].id, SnapshotImage::Before, &vault.restorer, true)
        .unwrap();
    assert_eq!(fs::read(vault.paths.database_file()).unwrap(), s0);
}

#[test]
fn cleanup_never_removes_in_flight_snapshot() {
    let vault = create_vault();
    let older = vault.snapshots.begin_snapshot(Operation::Add, "a").unwrap();
    vault.snapshots.complete_snapshot(&older.id).unwrap();
    let in_flight = vault.snapshots.begin_snapshot(Operation::Add, "b").unwrap();

    let report = vault
        .snapshots
        .cleanup(&RetentionPolicy::keep_latest(0).unwrap())
        .unwrap();

    assert_eq!(report.deleted, vec![older.id]);
    assert_eq!(report.skipped, vec![in_flight.id.clone()]);
    assert!(vault.snapshots.get(&in_flight.id).is_ok());
}

#[test]
fn backups_taken_back_to_back_never_collide() {
    let vault = create_vault();

    let first = vault.backups.create_backup().unwrap();
    let second = vault.backups.create_backup().unwrap();

    assert_ne!(first.filename, second.filename);
    assert!(first.path.exists());
    assert!(second.path.exists());
}

#[test]
fn cleanup_of_eight_backups_keeping_five_deletes_three_oldest() {
    let vault = create_vault();
    let created: Vec<_> = (0..8)
        .map(|_| vault.backups.create_backup().unwrap())
        .collect();

    let report = vault
        .backups
        .cleanup_old_backups(&RetentionPolicy::keep_latest(5).unwrap())
        .unwrap();

    assert_eq!(report.deleted_count(), 3);
    assert!(report.is_clean());
    for old in &created[..3] {
        assert!(!old.path.exists());
    }
    let remaining: Vec<_> = vault
        .backups
        .list_available_backups()
        .unwrap()
        .into_iter()
        .map(|b| b.filename)
        .collect();
    let newest: Vec<_> = created[3..].iter().rev().map(|b| b.filename.clone()).collect();
    assert_eq!(remaining, newest);
}

#[test]
fn negative_keep_count_is_rejected_before_deleting() {
    let vault = create_vault();
    vault.backups.create_backup().unwrap();

    let err = RetentionPolicy::keep_latest(-1).unwrap_err();

    assert!(matches!(err, VaultError::Retention(_)));
    assert_eq!(vault.backups.list_available_backups().unwrap().len(), 1);
}

#[test]
fn failed_safety_backup_leaves_live_store_identical() {
    let vault = create_vault();
    let target = vault.paths.base_dir().join("target.db");
    fs::copy(vault.paths.database_file(), &target).unwrap();
    rename_deploy(&vault);
    let live = fs::read(vault.paths.database_file()).unwrap();

    fs::remove_dir_all(vault.paths.manual_backup_dir()).unwrap();
    fs::write(vault.paths.manual_backup_dir(), b"not a directory").unwrap();

    assert!(vault.restorer.restore(&target, true).is_err());
    assert_eq!(fs::read(vault.paths.database_file()).unwrap(), live);
}

#[test]
fn service_undo_of_update_through_snapshot() {
    let temp = TempDir::new().unwrap();
    let paths = VaultPaths::with_base_dir(temp.path().to_path_buf());
    let mut service = SnippetService::open(&paths, &Settings::default()).unwrap();

    let id = service
        .add(NewSnippet::new("Deploy", "make deploy"))
        .unwrap()
        .value
        .id;
    let updated = service
        .update(id, NewSnippet::new("Deploy", "make deploy ENV=prod"))
        .unwrap();
    assert!(updated.snapshot.is_complete());

    service
        .restore_snapshot(updated.snapshot.snapshot_id(), SnapshotImage::Before, None)
        .unwrap();
    assert_eq!(
        service.store().get(id).unwrap().unwrap().command_text,
        "make deploy"
    );

    service
        .restore_snapshot(updated.snapshot.snapshot_id(), SnapshotImage::After, None)
        .unwrap();
    assert_eq!(
        service.store().get(id).unwrap().unwrap().command_text,
        "make deploy ENV=prod"
    );

    // Two restores, two safety backups
    assert_eq!(service.list_backups().unwrap().len(), 2);
}
