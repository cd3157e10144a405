//! Path management for Snippet Vault
//!
//! Provides XDG-compliant path resolution for the snippet store, settings
//! and the backup root.
//!
//! ## Path Resolution Order
//!
//! 1. `SNIPPET_VAULT_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/snippet-vault` or `~/.config/snippet-vault`
//! 3. Windows: `%APPDATA%\snippet-vault`
//! 4. Platform data directory from `directories` as a last resort
//!
//! ## Backup Layout
//!
//! ```text
//! <base>/backups/auto/<snapshot_id>/{before.db, after.db, metadata.json}
//! <base>/backups/manual/snippets_backup_<YYYYMMDD>_<HHMMSS>_<micros>.db
//! ```

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::VaultError;

/// Name of the directory holding per-operation snapshots
pub const SNAPSHOT_DIR_NAME: &str = "auto";

/// Name of the directory holding manual backups
pub const MANUAL_DIR_NAME: &str = "manual";

/// Manages all paths used by Snippet Vault
#[derive(Debug, Clone)]
pub struct VaultPaths {
    /// Base directory for all Snippet Vault data
    base_dir: PathBuf,
}

impl VaultPaths {
    /// Create a new VaultPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home or application data directory can be
    /// determined.
    pub fn new() -> Result<Self, VaultError> {
        let base_dir = if let Ok(custom) = std::env::var("SNIPPET_VAULT_DIR") {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create VaultPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory holding the live store
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the path to the live snippet store
    pub fn database_file(&self) -> PathBuf {
        self.data_dir().join("snippets.db")
    }

    /// Get the backup root
    pub fn backup_root(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Get the directory holding per-operation snapshots
    pub fn snapshot_dir(&self) -> PathBuf {
        self.backup_root().join(SNAPSHOT_DIR_NAME)
    }

    /// Get the directory holding manual backups
    pub fn manual_backup_dir(&self) -> PathBuf {
        self.backup_root().join(MANUAL_DIR_NAME)
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), VaultError> {
        for (label, dir) in [
            ("data", self.data_dir()),
            ("snapshot", self.snapshot_dir()),
            ("manual backup", self.manual_backup_dir()),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                VaultError::Io(format!(
                    "Failed to create {} directory {}: {}",
                    label,
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(())
    }

    /// Check if the vault has been initialized (store file exists)
    pub fn is_initialized(&self) -> bool {
        self.database_file().exists()
    }
}

/// Resolve the default data directory path based on platform
#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, VaultError> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join("snippet-vault"));
    }
    if let Ok(home) = std::env::var("HOME") {
        return Ok(PathBuf::from(home).join(".config").join("snippet-vault"));
    }
    project_data_dir()
}

/// Resolve the default data directory path based on platform
#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, VaultError> {
    match std::env::var("APPDATA") {
        Ok(appdata) => Ok(PathBuf::from(appdata).join("snippet-vault")),
        Err(_) => project_data_dir(),
    }
}

fn project_data_dir() -> Result<PathBuf, VaultError> {
    ProjectDirs::from("", "", "snippet-vault")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| VaultError::Config("Could not determine a data directory".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.data_dir(), temp_dir.path().join("data"));
        assert_eq!(
            paths.snapshot_dir(),
            temp_dir.path().join("backups").join("auto")
        );
        assert_eq!(
            paths.manual_backup_dir(),
            temp_dir.path().join("backups").join("manual")
        );
    }

    #[test]
    fn test_env_var_override() {
        let temp_dir = TempDir::new().unwrap();
        let custom_path = temp_dir.path().to_str().unwrap();

        env::set_var("SNIPPET_VAULT_DIR", custom_path);

        let paths = VaultPaths::new().unwrap();
        assert_eq!(paths.base_dir(), temp_dir.path());

        env::remove_var("SNIPPET_VAULT_DIR");
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());

        paths.ensure_directories().unwrap();

        assert!(paths.data_dir().exists());
        assert!(paths.snapshot_dir().exists());
        assert!(paths.manual_backup_dir().exists());
        assert!(!paths.is_initialized());
    }

    #[test]
    fn test_file_paths() {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.settings_file(), temp_dir.path().join("config.json"));
        assert_eq!(
            paths.database_file(),
            temp_dir.path().join("data").join("snippets.db")
        );
    }
}
