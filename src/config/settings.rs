//! User settings for Snippet Vault
//!
//! Manages user preferences, mainly the backup and snapshot retention
//! policies.

use serde::{Deserialize, Serialize};

use super::paths::VaultPaths;
use crate::backup::RetentionPolicy;
use crate::error::{VaultError, VaultResult};
use crate::storage::file_io::write_json_atomic;

/// Backup and snapshot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSettings {
    /// Number of manual backups kept by `backup prune`
    pub manual_keep_count: i64,
    /// Number of per-operation snapshots kept
    pub snapshot_keep_count: i64,
    /// Pending snapshots younger than this are never cleaned up
    pub pending_grace_secs: u64,
    /// Take a safety backup of the live store before every restore
    pub safety_backup_on_restore: bool,
    /// Apply snapshot retention after each completed snapshot
    pub auto_cleanup_snapshots: bool,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            manual_keep_count: 10,
            snapshot_keep_count: 50,
            pending_grace_secs: 300,
            safety_backup_on_restore: true,
            auto_cleanup_snapshots: true,
        }
    }
}

impl BackupSettings {
    /// Retention policy for manual backups
    pub fn manual_retention(&self) -> VaultResult<RetentionPolicy> {
        RetentionPolicy::keep_latest(self.manual_keep_count)
    }

    /// Retention policy for snapshots
    pub fn snapshot_retention(&self) -> VaultResult<RetentionPolicy> {
        RetentionPolicy::keep_latest(self.snapshot_keep_count)
    }

    /// Grace window protecting in-flight snapshots from cleanup
    pub fn pending_grace(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.pending_grace_secs.min(i64::MAX as u64) as i64)
    }
}

/// User settings for Snippet Vault
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Backup and snapshot settings
    #[serde(default)]
    pub backup: BackupSettings,

    /// Let two snippets share a name
    #[serde(default = "default_allow_duplicate_names")]
    pub allow_duplicate_names: bool,
}

fn default_schema_version() -> u32 {
    1
}

fn default_allow_duplicate_names() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            backup: BackupSettings::default(),
            allow_duplicate_names: default_allow_duplicate_names(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &VaultPaths) -> Result<Self, VaultError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
                VaultError::Io(format!(
                    "Failed to read settings file {}: {}",
                    settings_path.display(),
                    e
                ))
            })?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                VaultError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &VaultPaths) -> Result<(), VaultError> {
        write_json_atomic(paths.settings_file(), self)
    }

    /// Check that both retention policies are usable
    pub fn validate(&self) -> VaultResult<()> {
        self.backup.manual_retention()?;
        self.backup.snapshot_retention()?;
        Ok(())
    }
}
