//! Backup system for Snippet Vault
//!
//! Makes every mutating store operation recoverable and lets the user take
//! and restore manual copies of the store.
//!
//! # Architecture
//!
//! - `SnapshotRepository`: before/after images around each add, update or
//!   delete, under `<backupRoot>/auto/<snapshot_id>/`
//! - `ManualBackupManager`: timestamped whole-file copies under
//!   `<backupRoot>/manual/`
//! - `RetentionPolicy`: keep-N-most-recent rule shared by both
//! - `RestoreCoordinator`: validates an image, takes a safety backup, swaps
//!   the image in atomically and verifies it, rolling back on failure
//!
//! There is no transaction log. Whole-file copies written to a temp file and
//! renamed into place are the only consistency primitive.
//!
//! # Example
//!
//! ```rust,ignore
//! use snippet_vault::backup::{
//!     ManualBackupManager, Operation, RestoreCoordinator, RetentionPolicy, SnapshotImage,
//!     SnapshotRepository,
//! };
//! use snippet_vault::config::VaultPaths;
//!
//! let paths = VaultPaths::new()?;
//! let snapshots = SnapshotRepository::from_paths(&paths);
//! let backups = ManualBackupManager::from_paths(&paths);
//! let restorer = RestoreCoordinator::new(paths.database_file(), backups.clone());
//!
//! let snapshot = snapshots.begin_snapshot(Operation::Update, "Deploy")?;
//! // ... apply the update to the store ...
//! snapshots.complete_snapshot(&snapshot.id)?;
//!
//! // Undo it
//! snapshots.restore(&snapshot.id, SnapshotImage::Before, &restorer, true)?;
//! snapshots.cleanup(&RetentionPolicy::keep_latest(50)?)?;
//! ```

mod manager;
mod restore;
mod retention;
mod snapshot;
mod stamp;

pub use manager::{BackupArtifact, ManualBackupManager, BACKUP_EXTENSION, BACKUP_PREFIX};
pub use restore::{RestoreCoordinator, RestoreReport, RestoreStage};
pub use retention::{CleanupFailure, CleanupReport, Retainable, RetentionDecision, RetentionPolicy};
pub use snapshot::{
    Operation, Snapshot, SnapshotImage, SnapshotRepository, SnapshotState, SnapshotStatus,
    AFTER_IMAGE, BEFORE_IMAGE, METADATA_FILE,
};
pub use stamp::{format_stamp, next_stamp, parse_stamp};
