//! Retention policy shared by manual backups and snapshots
//!
//! Both artifact kinds are ordered the same way (newest first by capture
//! time, identifier descending on ties) and trimmed to the `keep_count` most
//! recent entries.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{VaultError, VaultResult};

/// Anything the retention policy can order and evict
pub trait Retainable {
    /// Capture instant used for ordering
    fn created_at(&self) -> DateTime<Utc>;

    /// Identifier used to break ties between equal capture instants
    fn retention_key(&self) -> &str;
}

/// Keep-N-most-recent rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    keep_count: usize,
}

impl RetentionPolicy {
    /// Build a policy keeping the `keep_count` newest artifacts
    ///
    /// Negative counts are rejected before any deletion can happen.
    pub fn keep_latest(keep_count: i64) -> VaultResult<Self> {
        if keep_count < 0 {
            return Err(VaultError::Retention(format!(
                "keep count must be zero or greater, got {}",
                keep_count
            )));
        }
        let keep_count = usize::try_from(keep_count)
            .map_err(|_| VaultError::Retention(format!("keep count {} is too large", keep_count)))?;
        Ok(Self { keep_count })
    }

    /// Number of artifacts this policy keeps
    pub fn keep_count(&self) -> usize {
        self.keep_count
    }

    /// Sort artifacts newest first
    pub fn order_by_recency<T: Retainable>(items: &mut [T]) {
        items.sort_by(|a, b| recency(b, a));
    }

    /// Split artifacts into the ones to keep and the ones to delete
    pub fn decide<T: Retainable>(&self, mut items: Vec<T>) -> RetentionDecision<T> {
        Self::order_by_recency(&mut items);
        let delete = if items.len() > self.keep_count {
            items.split_off(self.keep_count)
        } else {
            Vec::new()
        };

        RetentionDecision {
            keep: items,
            delete,
        }
    }
}

fn recency<T: Retainable>(a: &T, b: &T) -> Ordering {
    a.created_at()
        .cmp(&b.created_at())
        .then_with(|| a.retention_key().cmp(b.retention_key()))
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "keep {} most recent", self.keep_count)
    }
}

/// Outcome of applying a policy, newest first within each half
#[derive(Debug)]
pub struct RetentionDecision<T> {
    pub keep: Vec<T>,
    pub delete: Vec<T>,
}

/// One artifact that could not be deleted
#[derive(Debug, Clone, Serialize)]
pub struct CleanupFailure {
    /// Snapshot id or backup path
    pub identifier: String,
    pub error: String,
}

/// Best-effort cleanup result
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    /// Identifiers of deleted artifacts
    pub deleted: Vec<String>,
    /// Artifacts the policy selected but which were protected from deletion
    pub skipped: Vec<String>,
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn record_failure(&mut self, identifier: impl Into<String>, error: impl fmt::Display) {
        let identifier = identifier.into();
        tracing::warn!(artifact = %identifier, error = %error, "cleanup failed for artifact");
        self.failures.push(CleanupFailure {
            identifier,
            error: error.to_string(),
        });
    }

    /// One-line summary for display
    pub fn summary(&self) -> String {
        let mut summary = format!("Deleted {} artifact(s)", self.deleted.len());
        if !self.skipped.is_empty() {
            summary.push_str(&format!(", skipped {} in-flight", self.skipped.len()));
        }
        if !self.failures.is_empty() {
            summary.push_str(&format!(", {} failed", self.failures.len()));
        }
        summary
    }
}
