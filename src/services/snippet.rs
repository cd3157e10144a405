//! Snippet service
//!
//! Business logic over the snippet store. Every add, update and delete is
//! bracketed by a snapshot, and restores close the store around the file
//! swap. All mutating calls take `&mut self`, so a restore or cleanup can
//! never interleave with an in-flight snapshot capture.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::backup::{
    BackupArtifact, CleanupReport, ManualBackupManager, Operation, RestoreCoordinator,
    RestoreReport, RetentionPolicy, Snapshot, SnapshotImage, SnapshotRepository,
};
use crate::config::{BackupSettings, Settings, VaultPaths};
use crate::error::{VaultError, VaultResult};
use crate::export::{self, ImportStats};
use crate::models::{NewSnippet, Snippet};
use crate::storage::SnippetStore;

/// How the snapshot around a mutation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotCapture {
    /// Both images captured
    Completed { snapshot_id: String },
    /// The mutation was applied but the after-image is missing
    Incomplete { snapshot_id: String, error: String },
}

impl SnapshotCapture {
    pub fn snapshot_id(&self) -> &str {
        match self {
            Self::Completed { snapshot_id } | Self::Incomplete { snapshot_id, .. } => snapshot_id,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Result of a snapshotted mutation
#[derive(Debug, Clone)]
pub struct Mutation<T> {
    pub value: T,
    pub snapshot: SnapshotCapture,
}

/// Service for snippet management
pub struct SnippetService {
    store: SnippetStore,
    snapshots: SnapshotRepository,
    backups: ManualBackupManager,
    restorer: RestoreCoordinator,
    settings: BackupSettings,
    allow_duplicate_names: bool,
}

impl SnippetService {
    /// Open the store and backup components for a vault
    pub fn open(paths: &VaultPaths, settings: &Settings) -> VaultResult<Self> {
        settings.validate()?;
        paths.ensure_directories()?;

        let store = SnippetStore::open(paths.database_file())?;
        let backups = ManualBackupManager::from_paths(paths);
        let snapshots = SnapshotRepository::from_paths(paths)
            .with_pending_grace(settings.backup.pending_grace());
        let restorer = RestoreCoordinator::new(paths.database_file(), backups.clone());

        Ok(Self {
            store,
            snapshots,
            backups,
            restorer,
            settings: settings.backup.clone(),
            allow_duplicate_names: settings.allow_duplicate_names,
        })
    }

    /// Read access to the store
    pub fn store(&self) -> &SnippetStore {
        &self.store
    }

    pub fn snapshots(&self) -> &SnapshotRepository {
        &self.snapshots
    }

    pub fn backups(&self) -> &ManualBackupManager {
        &self.backups
    }

    /// Backup settings the service was opened with
    pub fn settings(&self) -> &BackupSettings {
        &self.settings
    }

    /// Create a new snippet
    pub fn add(&mut self, draft: NewSnippet) -> VaultResult<Mutation<Snippet>> {
        let draft = trimmed(draft);
        draft
            .validate()
            .map_err(|e| VaultError::Validation(e.to_string()))?;
        self.ensure_name_available(&draft.name, None)?;

        let subject = draft.name.clone();
        self.mutate(Operation::Add, &subject, |store| store.insert(&draft))
    }

    /// Replace a snippet's fields
    pub fn update(&mut self, id: i64, draft: NewSnippet) -> VaultResult<Mutation<Snippet>> {
        let draft = trimmed(draft);
        draft
            .validate()
            .map_err(|e| VaultError::Validation(e.to_string()))?;

        let existing = self
            .store
            .get(id)?
            .ok_or_else(|| VaultError::snippet_not_found(id.to_string()))?;
        self.ensure_name_available(&draft.name, Some(id))?;

        self.mutate(Operation::Update, &existing.name, |store| {
            store.update(id, &draft)
        })
    }

    fn ensure_name_available(&self, name: &str, exclude_id: Option<i64>) -> VaultResult<()> {
        if !self.allow_duplicate_names && self.store.name_exists(name, exclude_id)? {
            return Err(VaultError::Validation(format!(
                "A snippet with the name '{}' already exists",
                name
            )));
        }
        Ok(())
    }

    /// Delete a snippet
    pub fn delete(&mut self, id: i64) -> VaultResult<Mutation<Snippet>> {
        let existing = self
            .store
            .get(id)?
            .ok_or_else(|| VaultError::snippet_not_found(id.to_string()))?;

        self.mutate(Operation::Delete, &existing.name, |store| store.delete(id))
    }

    /// Find a snippet by id or exact name
    pub fn find(&self, identifier: &str) -> VaultResult<Option<Snippet>> {
        if let Ok(id) = identifier.parse::<i64>() {
            if let Some(snippet) = self.store.get(id)? {
                return Ok(Some(snippet));
            }
        }

        Ok(self
            .store
            .list()?
            .into_iter()
            .find(|s| s.name.eq_ignore_ascii_case(identifier.trim())))
    }

    /// Mark a snippet as used
    pub fn record_usage(&self, id: i64) -> VaultResult<()> {
        self.store.record_usage(id)
    }

    /// Run `apply` between a before- and after-snapshot
    ///
    /// A failed before-snapshot aborts without touching the store. A failed
    /// mutation marks the snapshot failed. A failed after-snapshot leaves the
    /// applied mutation in place and reports the pending snapshot.
    fn mutate<T, F>(
        &mut self,
        operation: Operation,
        subject: &str,
        apply: F,
    ) -> VaultResult<Mutation<T>>
    where
        F: FnOnce(&SnippetStore) -> VaultResult<T>,
    {
        let snapshot = self.snapshots.begin_snapshot(operation, subject)?;

        let value = match apply(&self.store) {
            Ok(value) => value,
            Err(e) => {
                if let Err(mark) = self.snapshots.fail_snapshot(&snapshot.id, &e.to_string()) {
                    tracing::warn!(snapshot = %snapshot.id, error = %mark, "could not mark snapshot failed");
                }
                return Err(e);
            }
        };

        let capture = match self.snapshots.complete_snapshot(&snapshot.id) {
            Ok(_) => {
                self.auto_cleanup();
                SnapshotCapture::Completed {
                    snapshot_id: snapshot.id,
                }
            }
            Err(e) => SnapshotCapture::Incomplete {
                snapshot_id: snapshot.id,
                error: e.to_string(),
            },
        };

        Ok(Mutation {
            value,
            snapshot: capture,
        })
    }

    fn auto_cleanup(&self) {
        if !self.settings.auto_cleanup_snapshots {
            return;
        }

        let cleaned = self
            .settings
            .snapshot_retention()
            .and_then(|policy| self.snapshots.cleanup(&policy));
        if let Err(e) = cleaned {
            tracing::warn!(error = %e, "automatic snapshot cleanup failed");
        }
    }

    /// Most recent snapshots first
    pub fn recent_snapshots(&self, limit: usize) -> VaultResult<Vec<Snapshot>> {
        self.snapshots.list_recent(limit)
    }

    /// Take a manual backup of the live store
    pub fn create_backup(&mut self) -> VaultResult<BackupArtifact> {
        self.backups.create_backup()
    }

    /// Manual backups, newest first
    pub fn list_backups(&self) -> VaultResult<Vec<BackupArtifact>> {
        self.backups.list_available_backups()
    }

    /// Apply manual backup retention; `None` uses the configured count
    pub fn cleanup_backups(&mut self, keep_count: Option<i64>) -> VaultResult<CleanupReport> {
        let policy = match keep_count {
            Some(count) => RetentionPolicy::keep_latest(count)?,
            None => self.settings.manual_retention()?,
        };
        self.backups.cleanup_old_backups(&policy)
    }

    /// Apply snapshot retention; `None` uses the configured count
    pub fn cleanup_snapshots(&mut self, keep_count: Option<i64>) -> VaultResult<CleanupReport> {
        let policy = match keep_count {
            Some(count) => RetentionPolicy::keep_latest(count)?,
            None => self.settings.snapshot_retention()?,
        };
        self.snapshots.cleanup(&policy)
    }

    /// Restore the live store from a backup file
    pub fn restore_backup(
        &mut self,
        source: &Path,
        keep_safety_backup: Option<bool>,
    ) -> VaultResult<RestoreReport> {
        let keep = keep_safety_backup.unwrap_or(self.settings.safety_backup_on_restore);
        let restorer = self.restorer.clone();
        self.with_store_closed(|| restorer.restore(source, keep))
    }

    /// Restore the live store from a snapshot image
    pub fn restore_snapshot(
        &mut self,
        id: &str,
        image: SnapshotImage,
        keep_safety_backup: Option<bool>,
    ) -> VaultResult<RestoreReport> {
        let keep = keep_safety_backup.unwrap_or(self.settings.safety_backup_on_restore);
        let snapshots = self.snapshots.clone();
        let restorer = self.restorer.clone();
        self.with_store_closed(|| snapshots.restore(id, image, &restorer, keep))
    }

    fn with_store_closed<T, F>(&mut self, restore: F) -> VaultResult<T>
    where
        F: FnOnce() -> VaultResult<T>,
    {
        self.store.close()?;
        let outcome = restore();
        let reopened = self.store.reopen();

        match (outcome, reopened) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), reopened) => {
                if let Err(reopen) = reopened {
                    tracing::error!(error = %reopen, "could not reopen store after failed restore");
                }
                Err(e)
            }
        }
    }

    /// Write every snippet to `path` as JSON
    pub fn export_to(&self, path: &Path) -> VaultResult<usize> {
        let file = File::create(path).map_err(|e| {
            VaultError::Io(format!("Failed to create {}: {}", path.display(), e))
        })?;
        let mut writer = BufWriter::new(file);
        let count = export::export_json(&self.store, &mut writer)?;
        writer.flush()?;
        Ok(count)
    }

    /// Import snippets from a JSON export, after taking a manual backup
    pub fn import_from(
        &mut self,
        path: &Path,
        replace_existing: bool,
    ) -> VaultResult<(BackupArtifact, ImportStats)> {
        let file = File::open(path).map_err(|e| {
            VaultError::Io(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let parsed = export::read_export(BufReader::new(file))?;

        let backup = self.backups.create_backup()?;
        let stats = export::import_json(&mut self.store, &parsed, replace_existing)?;
        Ok((backup, stats))
    }
}

fn trimmed(draft: NewSnippet) -> NewSnippet {
    NewSnippet {
        name: draft.name.trim().to_string(),
        description: draft.description.trim().to_string(),
        command_text: draft.command_text.trim().to_string(),
        tags: draft.tags.trim().to_string(),
    }
}
