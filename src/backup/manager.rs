//! Manual backup manager for Snippet Vault
//!
//! Handles user-requested whole-file copies of the live store, independent of
//! the per-operation snapshot stream. Backups are named
//! `snippets_backup_<YYYYMMDD>_<HHMMSS>_<micros>.db`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::paths::VaultPaths;
use crate::error::{VaultError, VaultResult};
use crate::storage::file_io::copy_file_atomic;

use super::retention::{CleanupReport, Retainable, RetentionPolicy};
use super::stamp::{format_stamp, next_stamp, parse_stamp};

/// File name prefix for manual backups
pub const BACKUP_PREFIX: &str = "snippets_backup_";

/// File extension for manual backups
pub const BACKUP_EXTENSION: &str = "db";

/// Attempts at finding an unused backup name before giving up
const NAME_ATTEMPTS: usize = 16;

/// A whole-file copy of the store at one instant
#[derive(Debug, Clone, Serialize)]
pub struct BackupArtifact {
    /// Backup filename
    pub filename: String,
    /// Full path to backup
    pub path: PathBuf,
    /// When the backup was captured
    pub created_at: DateTime<Utc>,
    /// Size in bytes, read when the artifact was produced or listed
    pub size_bytes: u64,
}

impl Retainable for BackupArtifact {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn retention_key(&self) -> &str {
        &self.filename
    }
}

/// Manages manual backup creation and retention
#[derive(Debug, Clone)]
pub struct ManualBackupManager {
    /// Path to backup directory
    backup_dir: PathBuf,
    /// Path to the live store
    store_path: PathBuf,
}

impl ManualBackupManager {
    /// Create a new ManualBackupManager
    pub fn new(backup_dir: impl Into<PathBuf>, store_path: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            store_path: store_path.into(),
        }
    }

    /// Create a manager for the standard vault layout
    pub fn from_paths(paths: &VaultPaths) -> Self {
        Self::new(paths.manual_backup_dir(), paths.database_file())
    }

    /// Get backup directory path
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Copy the live store into a new timestamped backup
    pub fn create_backup(&self) -> VaultResult<BackupArtifact> {
        if !self.store_path.is_file() {
            return Err(VaultError::Io(format!(
                "Store file {} is missing or not a regular file",
                self.store_path.display()
            )));
        }

        fs::create_dir_all(&self.backup_dir).map_err(|e| {
            VaultError::Io(format!(
                "Failed to create backup directory {}: {}",
                self.backup_dir.display(),
                e
            ))
        })?;

        let (created_at, filename, backup_path) = self.allocate_name()?;
        let size_bytes = match copy_file_atomic(&self.store_path, &backup_path) {
            Ok(size) => size,
            Err(e) => {
                let _ = fs::remove_file(&backup_path);
                return Err(e);
            }
        };

        tracing::info!(path = %backup_path.display(), size_bytes, "manual backup created");

        Ok(BackupArtifact {
            filename,
            path: backup_path,
            created_at,
            size_bytes,
        })
    }

    /// Pick a fresh backup name and claim it with an empty placeholder file
    ///
    /// The copy later renames over the placeholder, so two processes can never
    /// land on the same name.
    fn allocate_name(&self) -> VaultResult<(DateTime<Utc>, String, PathBuf)> {
        for _ in 0..NAME_ATTEMPTS {
            let stamp = next_stamp();
            let filename = format!(
                "{}{}.{}",
                BACKUP_PREFIX,
                format_stamp(&stamp),
                BACKUP_EXTENSION
            );
            let path = self.backup_dir.join(&filename);
            if reserve_path(&path)? {
                return Ok((stamp, filename, path));
            }
        }

        Err(VaultError::Io(format!(
            "Could not find an unused backup name in {}",
            self.backup_dir.display()
        )))
    }

    /// List all available backups, newest first
    ///
    /// Sizes are read from disk on every call. Files that vanish while
    /// listing are left out.
    pub fn list_available_backups(&self) -> VaultResult<Vec<BackupArtifact>> {
        let entries = match fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(VaultError::Io(format!(
                    "Failed to read backup directory {}: {}",
                    self.backup_dir.display(),
                    e
                )))
            }
        };

        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                VaultError::Io(format!("Failed to read directory entry: {}", e))
            })?;

            if let Some(info) = parse_backup_info(&entry.path()) {
                backups.push(info);
            }
        }

        RetentionPolicy::order_by_recency(&mut backups);
        Ok(backups)
    }

    /// Delete all but the newest backups allowed by `policy`
    ///
    /// Best effort: a failure on one file is recorded and the rest are still
    /// processed.
    pub fn cleanup_old_backups(&self, policy: &RetentionPolicy) -> VaultResult<CleanupReport> {
        let decision = policy.decide(self.list_available_backups()?);
        let mut report = CleanupReport::default();

        for backup in decision.delete {
            let identifier = backup.path.display().to_string();
            match fs::remove_file(&backup.path) {
                Ok(()) => {
                    tracing::debug!(path = %identifier, "deleted old backup");
                    report.deleted.push(identifier);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!(path = %identifier, "backup already removed");
                }
                Err(e) => report.record_failure(identifier, e),
            }
        }

        tracing::info!(
            policy = %policy,
            deleted = report.deleted_count(),
            failed = report.failures.len(),
            "manual backup cleanup finished"
        );
        Ok(report)
    }

    /// Get a specific backup by filename
    pub fn get_backup(&self, filename: &str) -> VaultResult<BackupArtifact> {
        parse_backup_info(&self.backup_dir.join(filename))
            .ok_or_else(|| VaultError::backup_not_found(filename))
    }

    /// Get the most recent backup
    pub fn latest_backup(&self) -> VaultResult<Option<BackupArtifact>> {
        Ok(self.list_available_backups()?.into_iter().next())
    }

    /// Resolve `latest`, a backup filename, or a path to a backup file
    pub fn resolve(&self, backup: &str) -> VaultResult<PathBuf> {
        if backup.eq_ignore_ascii_case("latest") {
            return self
                .latest_backup()?
                .map(|b| b.path)
                .ok_or_else(|| VaultError::backup_not_found("latest"));
        }

        let path = PathBuf::from(backup);
        if path.is_file() {
            return Ok(path);
        }

        let in_dir = self.backup_dir.join(backup);
        if in_dir.is_file() {
            return Ok(in_dir);
        }

        let with_ext = self
            .backup_dir
            .join(format!("{}.{}", backup, BACKUP_EXTENSION));
        if with_ext.is_file() {
            return Ok(with_ext);
        }

        Err(VaultError::backup_not_found(backup))
    }
}

/// Create `path` exclusively; `Ok(false)` when something already holds it
fn reserve_path(path: &Path) -> VaultResult<bool> {
    match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(VaultError::Io(format!(
            "Failed to reserve backup name {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Parse backup info from a backup file
fn parse_backup_info(path: &Path) -> Option<BackupArtifact> {
    let filename = path.file_name()?.to_string_lossy().to_string();

    let stamp = filename
        .strip_prefix(BACKUP_PREFIX)?
        .strip_suffix(&format!(".{}", BACKUP_EXTENSION))?;
    let created_at = parse_stamp(stamp)?;

    let metadata = fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }

    Some(BackupArtifact {
        filename,
        path: path.to_path_buf(),
        created_at,
        size_bytes: metadata.len(),
    })
}
