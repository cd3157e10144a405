//! Per-operation snapshots
//!
//! Every mutating store operation is bracketed by a snapshot: a copy of the
//! store taken just before (`before.db`) and, once the write is applied, just
//! after (`after.db`). Each snapshot lives in its own directory:
//!
//! ```text
//! <backupRoot>/auto/<snapshot_id>/
//!     before.db
//!     after.db          (completed snapshots only)
//!     metadata.json
//! ```
//!
//! The metadata record is written only after the image it refers to is
//! synced, so a crash at any point leaves at most one pending snapshot and
//! never touches a completed one.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::paths::VaultPaths;
use crate::error::{VaultError, VaultResult};
use crate::storage::file_io::{copy_file_atomic, read_json_required, write_json_atomic};

use super::restore::{RestoreCoordinator, RestoreReport};
use super::retention::{CleanupReport, Retainable, RetentionPolicy};
use super::stamp::{format_stamp, next_stamp, parse_stamp};

/// Pre-operation image
pub const BEFORE_IMAGE: &str = "before.db";

/// Post-operation image
pub const AFTER_IMAGE: &str = "after.db";

/// Metadata record
pub const METADATA_FILE: &str = "metadata.json";

/// Suffix of snapshot directories being removed by cleanup
const DELETING_SUFFIX: &str = ".deleting";

/// Attempts at claiming an unused snapshot directory
const ID_ATTEMPTS: usize = 16;

/// Default age below which a pending snapshot is considered in flight
pub const DEFAULT_PENDING_GRACE_SECS: i64 = 300;

/// Mutating operation a snapshot brackets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Status as persisted in `metadata.json`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    Pending,
    Completed,
    Failed,
}

impl fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Which image of a snapshot to restore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotImage {
    Before,
    After,
}

impl SnapshotImage {
    pub fn from_use_before(use_before: bool) -> Self {
        if use_before {
            Self::Before
        } else {
            Self::After
        }
    }
}

impl fmt::Display for SnapshotImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => write!(f, "before"),
            Self::After => write!(f, "after"),
        }
    }
}

/// Lifecycle state; only a completed snapshot carries an after-image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotState {
    Pending,
    Completed { after_timestamp: DateTime<Utc> },
    Failed { reason: Option<String> },
}

/// On-disk form of the metadata record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotRecord {
    snapshot_id: String,
    operation: Operation,
    snippet_name: String,
    before_timestamp: DateTime<Utc>,
    #[serde(default)]
    after_timestamp: Option<DateTime<Utc>>,
    status: SnapshotStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// A before/after capture of the store around one operation
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub id: String,
    pub operation: Operation,
    /// Display label of the affected snippet
    pub subject_name: String,
    pub before_timestamp: DateTime<Utc>,
    pub state: SnapshotState,
    dir: PathBuf,
}

impl Snapshot {
    fn from_record(dir: &Path, record: SnapshotRecord) -> VaultResult<Self> {
        let invalid = |detail: &str| {
            VaultError::Snapshot(format!(
                "metadata in {} is inconsistent: {}",
                dir.display(),
                detail
            ))
        };

        let dir_name = dir.file_name().map(|n| n.to_string_lossy().to_string());
        if dir_name.as_deref() != Some(record.snapshot_id.as_str()) {
            return Err(invalid("snapshot_id does not match directory name"));
        }

        let state = match (record.status, record.after_timestamp) {
            (SnapshotStatus::Completed, Some(after_timestamp)) => {
                SnapshotState::Completed { after_timestamp }
            }
            (SnapshotStatus::Completed, None) => {
                return Err(invalid("completed without after_timestamp"))
            }
            (SnapshotStatus::Pending, None) => SnapshotState::Pending,
            (SnapshotStatus::Failed, None) => SnapshotState::Failed {
                reason: record.error,
            },
            (_, Some(_)) => return Err(invalid("after_timestamp set on an incomplete snapshot")),
        };

        Ok(Self {
            id: record.snapshot_id,
            operation: record.operation,
            subject_name: record.snippet_name,
            before_timestamp: record.before_timestamp,
            state,
            dir: dir.to_path_buf(),
        })
    }

    fn to_record(&self) -> SnapshotRecord {
        let (after_timestamp, error) = match &self.state {
            SnapshotState::Pending => (None, None),
            SnapshotState::Completed { after_timestamp } => (Some(*after_timestamp), None),
            SnapshotState::Failed { reason } => (None, reason.clone()),
        };

        SnapshotRecord {
            snapshot_id: self.id.clone(),
            operation: self.operation,
            snippet_name: self.subject_name.clone(),
            before_timestamp: self.before_timestamp,
            after_timestamp,
            status: self.status(),
            error,
        }
    }

    pub fn status(&self) -> SnapshotStatus {
        match self.state {
            SnapshotState::Pending => SnapshotStatus::Pending,
            SnapshotState::Completed { .. } => SnapshotStatus::Completed,
            SnapshotState::Failed { .. } => SnapshotStatus::Failed,
        }
    }

    /// Directory holding this snapshot's files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn before_path(&self) -> PathBuf {
        self.dir.join(BEFORE_IMAGE)
    }

    /// Present only once the snapshot is completed
    pub fn after_path(&self) -> Option<PathBuf> {
        match self.state {
            SnapshotState::Completed { .. } => Some(self.dir.join(AFTER_IMAGE)),
            _ => None,
        }
    }

    pub fn after_timestamp(&self) -> Option<DateTime<Utc>> {
        match self.state {
            SnapshotState::Completed { after_timestamp } => Some(after_timestamp),
            _ => None,
        }
    }

    /// Path of the requested image
    pub fn image_path(&self, image: SnapshotImage) -> VaultResult<PathBuf> {
        match image {
            SnapshotImage::Before => Ok(self.before_path()),
            SnapshotImage::After => self.after_path().ok_or_else(|| VaultError::NotFound {
                entity_type: "Snapshot after-image",
                identifier: format!("{} ({})", self.id, self.status()),
            }),
        }
    }

    /// Pending and young enough that its operation may still be running
    pub fn is_in_flight(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        self.state == SnapshotState::Pending && now - self.before_timestamp < grace
    }

    /// Both images referenced by the metadata are on disk
    fn images_present(&self) -> bool {
        self.before_path().is_file() && self.after_path().map_or(true, |p| p.is_file())
    }
}

impl Retainable for Snapshot {
    fn created_at(&self) -> DateTime<Utc> {
        self.before_timestamp
    }

    fn retention_key(&self) -> &str {
        &self.id
    }
}

/// A snapshot directory as cleanup sees it
#[derive(Debug)]
struct SnapshotEntry {
    id: String,
    /// Parsed from the directory name
    stamp: DateTime<Utc>,
    dir: PathBuf,
    /// `None` when metadata or images are missing or unreadable
    snapshot: Option<Snapshot>,
}

impl SnapshotEntry {
    /// Unreadable directories count as pending until the grace window passes
    fn is_in_flight(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        match &self.snapshot {
            Some(snapshot) => snapshot.is_in_flight(now, grace),
            None => now - self.stamp < grace,
        }
    }
}

impl Retainable for SnapshotEntry {
    fn created_at(&self) -> DateTime<Utc> {
        self.stamp
    }

    fn retention_key(&self) -> &str {
        &self.id
    }
}

/// Owns the snapshot directory tree
#[derive(Debug, Clone)]
pub struct SnapshotRepository {
    root: PathBuf,
    store_path: PathBuf,
    pending_grace: Duration,
}

impl SnapshotRepository {
    pub fn new(root: impl Into<PathBuf>, store_path: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            store_path: store_path.into(),
            pending_grace: Duration::seconds(DEFAULT_PENDING_GRACE_SECS),
        }
    }

    /// Create a repository for the standard vault layout
    pub fn from_paths(paths: &VaultPaths) -> Self {
        Self::new(paths.snapshot_dir(), paths.database_file())
    }

    /// Age below which cleanup leaves pending snapshots alone
    pub fn with_pending_grace(mut self, grace: Duration) -> Self {
        self.pending_grace = grace;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Capture the pre-operation image
    ///
    /// On error nothing is left behind and the caller must not run the
    /// mutation.
    pub fn begin_snapshot(&self, operation: Operation, subject_name: &str) -> VaultResult<Snapshot> {
        fs::create_dir_all(&self.root).map_err(|e| {
            VaultError::Io(format!(
                "Failed to create snapshot directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let (before_timestamp, id, dir) = self.claim_directory()?;
        let snapshot = Snapshot {
            id,
            operation,
            subject_name: subject_name.to_string(),
            before_timestamp,
            state: SnapshotState::Pending,
            dir,
        };

        let captured = copy_file_atomic(&self.store_path, &snapshot.before_path())
            .and_then(|_| write_json_atomic(snapshot.dir.join(METADATA_FILE), &snapshot.to_record()));

        if let Err(e) = captured {
            tracing::error!(snapshot = %snapshot.id, error = %e, "before-image capture failed");
            if let Err(cleanup) = fs::remove_dir_all(&snapshot.dir) {
                tracing::warn!(snapshot = %snapshot.id, error = %cleanup, "could not remove partial snapshot");
            }
            return Err(e);
        }

        tracing::info!(
            snapshot = %snapshot.id,
            operation = %operation,
            subject = %subject_name,
            "snapshot pending"
        );
        Ok(snapshot)
    }

    fn claim_directory(&self) -> VaultResult<(DateTime<Utc>, String, PathBuf)> {
        for _ in 0..ID_ATTEMPTS {
            let stamp = next_stamp();
            let id = format_stamp(&stamp);
            let dir = self.root.join(&id);
            match fs::create_dir(&dir) {
                Ok(()) => return Ok((stamp, id, dir)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(VaultError::Io(format!(
                        "Failed to create snapshot directory {}: {}",
                        dir.display(),
                        e
                    )))
                }
            }
        }

        Err(VaultError::Io(format!(
            "Could not allocate a snapshot id in {}",
            self.root.display()
        )))
    }

    /// Capture the post-operation image and mark the snapshot completed
    ///
    /// If the copy fails the snapshot stays pending with its before-image as
    /// the recovery point.
    pub fn complete_snapshot(&self, id: &str) -> VaultResult<Snapshot> {
        let mut snapshot = self.get(id)?;
        if snapshot.state != SnapshotState::Pending {
            return Err(VaultError::Snapshot(format!(
                "cannot complete snapshot {} in state {}",
                id,
                snapshot.status()
            )));
        }

        let after_timestamp = Utc::now();
        let after_path = snapshot.dir.join(AFTER_IMAGE);
        copy_file_atomic(&self.store_path, &after_path).map_err(|e| {
            tracing::error!(snapshot = %id, error = %e, "after-image capture failed, snapshot left pending");
            e
        })?;

        snapshot.state = SnapshotState::Completed { after_timestamp };
        if let Err(e) = write_json_atomic(snapshot.dir.join(METADATA_FILE), &snapshot.to_record()) {
            let _ = fs::remove_file(&after_path);
            return Err(e);
        }

        tracing::info!(snapshot = %id, "snapshot completed");
        Ok(snapshot)
    }

    /// Record that the bracketed operation itself failed
    pub fn fail_snapshot(&self, id: &str, reason: &str) -> VaultResult<Snapshot> {
        let mut snapshot = self.get(id)?;
        if snapshot.state != SnapshotState::Pending {
            return Err(VaultError::Snapshot(format!(
                "cannot fail snapshot {} in state {}",
                id,
                snapshot.status()
            )));
        }

        snapshot.state = SnapshotState::Failed {
            reason: Some(reason.to_string()),
        };
        write_json_atomic(snapshot.dir.join(METADATA_FILE), &snapshot.to_record())?;

        tracing::warn!(snapshot = %id, reason, "snapshot marked failed");
        Ok(snapshot)
    }

    /// Load one snapshot
    pub fn get(&self, id: &str) -> VaultResult<Snapshot> {
        if parse_stamp(id).is_none() {
            return Err(VaultError::snapshot_not_found(id));
        }

        let dir = self.root.join(id);
        let metadata = dir.join(METADATA_FILE);
        if !metadata.is_file() {
            return Err(VaultError::snapshot_not_found(id));
        }

        let record: SnapshotRecord = read_json_required(&metadata)?;
        Snapshot::from_record(&dir, record)
    }

    /// Most recent snapshots first, at most `limit` of them
    pub fn list_recent(&self, limit: usize) -> VaultResult<Vec<Snapshot>> {
        let mut snapshots = self.list_all()?;
        snapshots.truncate(limit);
        Ok(snapshots)
    }

    /// Every readable snapshot, newest first
    ///
    /// Directories with missing or malformed metadata, or whose images are
    /// gone, are skipped.
    pub fn list_all(&self) -> VaultResult<Vec<Snapshot>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(VaultError::Io(format!(
                    "Failed to read snapshot directory {}: {}",
                    self.root.display(),
                    e
                )))
            }
        };

        let mut snapshots = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                VaultError::Io(format!("Failed to read directory entry: {}", e))
            })?;
            let name = entry.file_name().to_string_lossy().to_string();
            if parse_stamp(&name).is_none() || !entry.path().is_dir() {
                continue;
            }

            match self.get(&name) {
                Ok(snapshot) if snapshot.images_present() => snapshots.push(snapshot),
                Ok(_) => tracing::warn!(snapshot = %name, "skipping snapshot with missing image"),
                Err(e) => tracing::warn!(snapshot = %name, error = %e, "skipping unreadable snapshot"),
            }
        }

        RetentionPolicy::order_by_recency(&mut snapshots);
        Ok(snapshots)
    }

    /// Restore the live store from one of a snapshot's images
    pub fn restore(
        &self,
        id: &str,
        image: SnapshotImage,
        coordinator: &RestoreCoordinator,
        keep_safety_backup: bool,
    ) -> VaultResult<RestoreReport> {
        let snapshot = self.get(id)?;
        let source = snapshot.image_path(image)?;

        tracing::info!(snapshot = %id, image = %image, "restoring from snapshot");
        coordinator.restore(&source, keep_safety_backup)
    }

    /// Delete snapshots beyond the policy, never touching in-flight ones
    ///
    /// Every stamp-named directory takes part, including crash leftovers
    /// whose metadata or images are missing or unreadable. Those are ranked
    /// by the stamp in their name and protected by the same grace window as
    /// pending snapshots. A directory is renamed out of the listing before
    /// its files are removed, so it disappears as a unit.
    pub fn cleanup(&self, policy: &RetentionPolicy) -> VaultResult<CleanupReport> {
        self.sweep_deleting_dirs();

        let decision = policy.decide(self.scan_entries()?);
        let now = Utc::now();
        let mut report = CleanupReport::default();

        for entry in decision.delete {
            if entry.is_in_flight(now, self.pending_grace) {
                tracing::debug!(snapshot = %entry.id, "keeping in-flight snapshot");
                report.skipped.push(entry.id);
                continue;
            }

            if entry.snapshot.is_none() {
                tracing::info!(snapshot = %entry.id, "removing unreadable snapshot directory");
            }

            let doomed = self.root.join(format!(".{}{}", entry.id, DELETING_SUFFIX));
            if let Err(e) = fs::rename(&entry.dir, &doomed) {
                report.record_failure(entry.id, e);
                continue;
            }

            if let Err(e) = fs::remove_dir_all(&doomed) {
                tracing::warn!(path = %doomed.display(), error = %e, "snapshot unlisted but files remain");
            }
            report.deleted.push(entry.id);
        }

        tracing::info!(
            policy = %policy,
            deleted = report.deleted_count(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "snapshot cleanup finished"
        );
        Ok(report)
    }

    /// Every stamp-named directory under the root, readable or not
    fn scan_entries(&self) -> VaultResult<Vec<SnapshotEntry>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(VaultError::Io(format!(
                    "Failed to read snapshot directory {}: {}",
                    self.root.display(),
                    e
                )))
            }
        };

        let mut scanned = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                VaultError::Io(format!("Failed to read directory entry: {}", e))
            })?;
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(stamp) = parse_stamp(&name) else {
                continue;
            };
            if !entry.path().is_dir() {
                continue;
            }

            let snapshot = self.get(&name).ok().filter(Snapshot::images_present);
            scanned.push(SnapshotEntry {
                id: name,
                stamp,
                dir: entry.path(),
                snapshot,
            });
        }

        Ok(scanned)
    }

    /// Remove leftovers of earlier interrupted deletions
    fn sweep_deleting_dirs(&self) {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return;
        };

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') && name.ends_with(DELETING_SUFFIX) {
                if let Err(e) = fs::remove_dir_all(entry.path()) {
                    tracing::warn!(path = %entry.path().display(), error = %e, "could not sweep deleted snapshot");
                }
            }
        }
    }
}
