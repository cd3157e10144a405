//! Backup restoration for Snippet Vault
//!
//! Replaces the live store with a backup or snapshot image. A restore walks
//! `validating -> safety-backup -> copying -> swapping -> verifying` and ends
//! either done or rolled back. Nothing touches the live store before the
//! swap, and the swap itself is a single rename.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{VaultError, VaultResult};
use crate::storage::file_io::{commit_staged, set_aside_sqlite_sidecars, stage_copy};
use crate::storage::store::verify_store_file;

use super::manager::{BackupArtifact, ManualBackupManager};

/// Steps of a restore attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestoreStage {
    Validating,
    SafetyBackup,
    Copying,
    Swapping,
    Verifying,
    Done,
    RolledBack,
}

impl fmt::Display for RestoreStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Validating => "validating",
            Self::SafetyBackup => "safety-backup",
            Self::Copying => "copying",
            Self::Swapping => "swapping",
            Self::Verifying => "verifying",
            Self::Done => "done",
            Self::RolledBack => "rolled-back",
        };
        write!(f, "{}", label)
    }
}

/// Result of a successful restore
#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    /// Image the live store now matches
    pub source: PathBuf,
    /// Copy of the previous live store, if one was taken
    pub safety_backup: Option<BackupArtifact>,
    /// Size of the restored store
    pub bytes_restored: u64,
}

impl RestoreReport {
    /// Get a summary of the restore
    pub fn summary(&self) -> String {
        match &self.safety_backup {
            Some(backup) => format!(
                "Restored {} ({} bytes); previous store saved as {}",
                self.source.display(),
                self.bytes_restored,
                backup.filename
            ),
            None => format!(
                "Restored {} ({} bytes); no safety backup taken",
                self.source.display(),
                self.bytes_restored
            ),
        }
    }
}

/// Swaps validated images into the live store's place
#[derive(Debug, Clone)]
pub struct RestoreCoordinator {
    store_path: PathBuf,
    backups: ManualBackupManager,
}

impl RestoreCoordinator {
    /// Create a coordinator; safety backups go through `backups`
    pub fn new(store_path: impl Into<PathBuf>, backups: ManualBackupManager) -> Self {
        Self {
            store_path: store_path.into(),
            backups,
        }
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Check that `source` exists and holds a readable store
    pub fn validate_source(&self, source: &Path) -> VaultResult<()> {
        if !source.is_file() || fs::File::open(source).is_err() {
            return Err(VaultError::backup_not_found(source.display().to_string()));
        }
        verify_store_file(source)
    }

    /// Replace the live store with `source`
    ///
    /// The store must be closed by the caller. Any failure before the swap
    /// leaves the live store untouched; a swapped store that fails
    /// verification is rolled back to the safety backup, or reported as
    /// [`VaultError::UnknownState`] when that is impossible.
    pub fn restore(&self, source: &Path, keep_safety_backup: bool) -> VaultResult<RestoreReport> {
        enter(RestoreStage::Validating, source);
        self.validate_source(source)?;

        let safety_backup = if keep_safety_backup {
            enter(RestoreStage::SafetyBackup, source);
            let backup = self.backups.create_backup().map_err(|e| {
                tracing::error!(error = %e, "safety backup failed, restore aborted");
                VaultError::Io(format!(
                    "Restore of {} aborted, live store untouched: safety backup failed: {}",
                    source.display(),
                    e
                ))
            })?;
            Some(backup)
        } else {
            tracing::warn!("restoring without a safety backup");
            None
        };

        enter(RestoreStage::Copying, source);
        let staged = stage_copy(source, &self.store_path)?;

        enter(RestoreStage::Swapping, source);
        let sidecars = match set_aside_sqlite_sidecars(&self.store_path) {
            Ok(sidecars) => sidecars,
            Err(e) => {
                let _ = fs::remove_file(&staged);
                return Err(e);
            }
        };
        if let Err(e) = commit_staged(&staged, &self.store_path) {
            return Err(match sidecars.put_back() {
                Ok(()) => VaultError::Io(format!("{}; live store unchanged", e)),
                Err(put_back) => VaultError::Io(format!(
                    "{}; live store file unchanged but its journal is still set aside: {}",
                    e, put_back
                )),
            });
        }
        sidecars.discard();

        enter(RestoreStage::Verifying, source);
        if let Err(cause) = verify_store_file(&self.store_path) {
            return Err(self.roll_back(safety_backup.as_ref(), cause));
        }

        let bytes_restored = fs::metadata(&self.store_path)
            .map(|m| m.len())
            .unwrap_or_default();

        enter(RestoreStage::Done, source);
        Ok(RestoreReport {
            source: source.to_path_buf(),
            safety_backup,
            bytes_restored,
        })
    }

    /// Put the safety backup back after a failed verification
    ///
    /// Always returns the error describing where the store ended up.
    fn roll_back(&self, safety_backup: Option<&BackupArtifact>, cause: VaultError) -> VaultError {
        let Some(backup) = safety_backup else {
            tracing::error!(error = %cause, "restored store failed verification with no safety backup");
            return VaultError::UnknownState(format!(
                "{} failed verification after restore and no safety backup exists: {}",
                self.store_path.display(),
                cause
            ));
        };

        let rolled_back = stage_copy(&backup.path, &self.store_path)
            .and_then(|staged| commit_staged(&staged, &self.store_path))
            .and_then(|_| verify_store_file(&self.store_path));

        match rolled_back {
            Ok(()) => {
                enter(RestoreStage::RolledBack, &backup.path);
                VaultError::Integrity(format!(
                    "restored store failed verification ({}); rolled back to safety backup {}",
                    cause,
                    backup.path.display()
                ))
            }
            Err(e) => {
                tracing::error!(error = %e, "rollback failed");
                VaultError::UnknownState(format!(
                    "{} failed verification ({}) and rollback from {} failed: {}",
                    self.store_path.display(),
                    cause,
                    backup.path.display(),
                    e
                ))
            }
        }
    }
}

fn enter(stage: RestoreStage, source: &Path) {
    tracing::debug!(stage = %stage, source = %source.display(), "restore stage");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::VaultPaths;
    use crate::models::NewSnippet;
    use crate::storage::store::SnippetStore;
    use tempfile::TempDir;

    struct TestEnv {
        paths: VaultPaths,
        coordinator: RestoreCoordinator,
        backups: ManualBackupManager,
        _temp: TempDir,
    }

    fn create_test_env() -> TestEnv {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        paths.ensure_directories().unwrap();

        let mut store = SnippetStore::open(paths.database_file()).unwrap();
        store.insert(&NewSnippet::new("Original", "echo one")).unwrap();
        store.close().unwrap();

        let backups = ManualBackupManager::from_paths(&paths);
        let coordinator = RestoreCoordinator::new(paths.database_file(), backups.clone());

        TestEnv {
            paths,
            coordinator,
            backups,
            _temp: temp_dir,
        }
    }

    fn add_snippet(paths: &VaultPaths, name: &str) {
        let mut store = SnippetStore::open(paths.database_file()).unwrap();
        store.insert(&NewSnippet::new(name, "echo")).unwrap();
        store.close().unwrap();
    }

    #[test]
    fn test_restore_from_backup() {
        let env = create_test_env();
        let backup = env.backups.create_backup().unwrap();
        let backup_bytes = fs::read(&backup.path).unwrap();

        add_snippet(&env.paths, "Later");
        let report = env.coordinator.restore(&backup.path, true).unwrap();

        assert_eq!(fs::read(env.paths.database_file()).unwrap(), backup_bytes);
        assert!(report.safety_backup.is_some());
        assert_eq!(report.bytes_restored, backup_bytes.len() as u64);

        let store = SnippetStore::open(env.paths.database_file()).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_safety_backup_holds_previous_store() {
        let env = create_test_env();
        let backup = env.backups.create_backup().unwrap();
        add_snippet(&env.paths, "Later");
        let before_restore = fs::read(env.paths.database_file()).unwrap();

        let report = env.coordinator.restore(&backup.path, true).unwrap();

        let safety = report.safety_backup.as_ref().unwrap();
        assert_eq!(fs::read(&safety.path).unwrap(), before_restore);
        assert!(report.summary().contains(&safety.filename));
    }

    #[test]
    fn test_missing_source_is_not_found() {
        let env = create_test_env();
        let live = fs::read(env.paths.database_file()).unwrap();

        let err = env
            .coordinator
            .restore(&env.paths.base_dir().join("missing.db"), true)
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(fs::read(env.paths.database_file()).unwrap(), live);
        assert!(env.backups.list_available_backups().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_source_rejected_before_any_change() {
        let env = create_test_env();
        let live = fs::read(env.paths.database_file()).unwrap();
        let corrupt = env.paths.base_dir().join("corrupt.db");
        fs::write(&corrupt, b"garbage garbage garbage").unwrap();

        let err = env.coordinator.restore(&corrupt, true).unwrap_err();

        assert!(matches!(err, VaultError::Integrity(_)));
        assert_eq!(fs::read(env.paths.database_file()).unwrap(), live);
    }

    #[test]
    fn test_failed_safety_backup_aborts_restore() {
        let env = create_test_env();
        let backup = env.backups.create_backup().unwrap();
        add_snippet(&env.paths, "Later");
        let live = fs::read(env.paths.database_file()).unwrap();

        // Safety backups land in a directory that cannot be created
        let blocked = env.paths.base_dir().join("blocked");
        fs::write(&blocked, b"").unwrap();
        let coordinator = RestoreCoordinator::new(
            env.paths.database_file(),
            ManualBackupManager::new(blocked.join("manual"), env.paths.database_file()),
        );

        let err = coordinator.restore(&backup.path, true).unwrap_err();

        assert!(matches!(err, VaultError::Io(_)));
        assert_eq!(fs::read(env.paths.database_file()).unwrap(), live);
    }

    #[test]
    fn test_restore_without_safety_backup() {
        let env = create_test_env();
        let backup = env.backups.create_backup().unwrap();

        let report = env.coordinator.restore(&backup.path, false).unwrap();

        assert!(report.safety_backup.is_none());
        assert_eq!(env.backups.list_available_backups().unwrap().len(), 1);
    }

    #[test]
    fn test_stale_journal_removed_on_swap() {
        let env = create_test_env();
        let backup = env.backups.create_backup().unwrap();
        let journal = env.paths.data_dir().join("snippets.db-journal");
        fs::write(&journal, b"stale").unwrap();

        env.coordinator.restore(&backup.path, false).unwrap();

        assert!(!journal.exists());
    }

    #[test]
    fn test_failed_swap_keeps_live_journal() {
        let env = create_test_env();
        let backup = env.backups.create_backup().unwrap();

        // A directory in the store's place makes the final rename fail
        let blocked_store = env.paths.base_dir().join("blocked.db");
        fs::create_dir_all(blocked_store.join("inner")).unwrap();
        let journal = env.paths.base_dir().join("blocked.db-journal");
        fs::write(&journal, b"hot journal").unwrap();
        let coordinator = RestoreCoordinator::new(&blocked_store, env.backups.clone());

        let err = coordinator.restore(&backup.path, false).unwrap_err();

        assert!(matches!(err, VaultError::Io(_)));
        assert!(err.to_string().contains("live store unchanged"));
        assert_eq!(fs::read(&journal).unwrap(), b"hot journal");
        assert!(blocked_store.join("inner").is_dir());
    }

    #[test]
    fn test_roll_back_restores_safety_backup() {
        let env = create_test_env();
        let safety = env.backups.create_backup().unwrap();
        fs::write(env.paths.database_file(), b"corrupted after swap").unwrap();

        let err = env
            .coordinator
            .roll_back(Some(&safety), VaultError::Integrity("bad".into()));

        assert!(matches!(err, VaultError::Integrity(_)));
        assert_eq!(
            fs::read(env.paths.database_file()).unwrap(),
            fs::read(&safety.path).unwrap()
        );
    }

    #[test]
    fn test_roll_back_without_safety_is_fatal() {
        let env = create_test_env();

        let err = env
            .coordinator
            .roll_back(None, VaultError::Integrity("bad".into()));

        assert!(err.is_fatal());
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(RestoreStage::SafetyBackup.to_string(), "safety-backup");
        assert_eq!(RestoreStage::RolledBack.to_string(), "rolled-back");
    }
}
