//! Backup and snapshot display formatting

use chrono::{DateTime, Utc};

use crate::backup::{BackupArtifact, CleanupReport, Snapshot, SnapshotState};

use super::{format_duration, format_size, truncate};

const SUBJECT_WIDTH: usize = 32;

/// Format manual backups, newest first, numbered for `restore`
pub fn format_backup_list(backups: &[BackupArtifact], now: DateTime<Utc>, detailed: bool) -> String {
    if backups.is_empty() {
        return "No backups found.".to_string();
    }

    let mut output = String::new();
    for (i, backup) in backups.iter().enumerate() {
        let age = format_duration(now.signed_duration_since(backup.created_at));

        if detailed {
            output.push_str(&format!(
                "{}. {}\n   Created: {}\n   Size: {}\n   Age: {}\n   Path: {}\n\n",
                i + 1,
                backup.filename,
                backup.created_at.format("%Y-%m-%d %H:%M:%S%.6f UTC"),
                format_size(backup.size_bytes),
                age,
                backup.path.display(),
            ));
        } else {
            output.push_str(&format!(
                "  {}. {} ({} ago, {})\n",
                i + 1,
                backup.filename,
                age,
                format_size(backup.size_bytes),
            ));
        }
    }

    output.push_str(&format!("\nTotal: {} backup(s)\n", backups.len()));
    output
}

/// Format snapshots as a table, newest first
pub fn format_snapshot_list(snapshots: &[Snapshot]) -> String {
    if snapshots.is_empty() {
        return "No snapshots found.".to_string();
    }

    let id_width = snapshots.iter().map(|s| s.id.len()).max().unwrap_or(2).max(2);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<id_width$}  {:<6}  {:<subject_width$}  {:<9}  {}\n",
        "ID",
        "Op",
        "Snippet",
        "Status",
        "Taken",
        id_width = id_width,
        subject_width = SUBJECT_WIDTH,
    ));
    output.push_str(&format!(
        "{:-<id_width$}  {:-<6}  {:-<subject_width$}  {:-<9}  {:-<19}\n",
        "",
        "",
        "",
        "",
        "",
        id_width = id_width,
        subject_width = SUBJECT_WIDTH,
    ));

    for snapshot in snapshots {
        output.push_str(&format!(
            "{:<id_width$}  {:<6}  {:<subject_width$}  {:<9}  {}\n",
            snapshot.id,
            snapshot.operation.to_string(),
            truncate(&snapshot.subject_name, SUBJECT_WIDTH),
            snapshot.status().to_string(),
            snapshot.before_timestamp.format("%Y-%m-%d %H:%M:%S"),
            id_width = id_width,
            subject_width = SUBJECT_WIDTH,
        ));
    }

    output
}

/// Format a snapshot's metadata and image locations
pub fn format_snapshot_details(snapshot: &Snapshot) -> String {
    let mut output = String::new();

    output.push_str(&format!("Snapshot: {}\n", snapshot.id));
    output.push_str(&format!("  Operation: {}\n", snapshot.operation));
    output.push_str(&format!("  Snippet:   {}\n", snapshot.subject_name));
    output.push_str(&format!("  Status:    {}\n", snapshot.status()));
    output.push_str(&format!(
        "  Before:    {}\n",
        snapshot.before_timestamp.format("%Y-%m-%d %H:%M:%S%.6f UTC")
    ));

    match &snapshot.state {
        SnapshotState::Completed { after_timestamp } => {
            output.push_str(&format!(
                "  After:     {}\n",
                after_timestamp.format("%Y-%m-%d %H:%M:%S%.6f UTC")
            ));
        }
        SnapshotState::Failed { reason: Some(reason) } => {
            output.push_str(&format!("  Error:     {}\n", reason));
        }
        SnapshotState::Failed { reason: None } | SnapshotState::Pending => {}
    }

    output.push_str(&format!("  Location:  {}\n", snapshot.dir().display()));
    output
}

/// Format a cleanup report, listing each failure
pub fn format_cleanup_report(report: &CleanupReport) -> String {
    let mut output = format!("{}.\n", report.summary());
    for failure in &report.failures {
        output.push_str(&format!("  failed: {}: {}\n", failure.identifier, failure.error));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::CleanupFailure;
    use std::path::PathBuf;

    #[test]
    fn test_backup_list_numbers_entries() {
        let now = Utc::now();
        let backups = vec![BackupArtifact {
            filename: "snippets_backup_20250102_030405_000006.db".into(),
            path: PathBuf::from("/tmp/snippets_backup_20250102_030405_000006.db"),
            created_at: now - chrono::Duration::minutes(5),
            size_bytes: 4096,
        }];

        let output = format_backup_list(&backups, now, false);

        assert!(output.contains("1. snippets_backup_20250102_030405_000006.db (5m ago, 4.0 KB)"));
        assert!(output.contains("Total: 1 backup(s)"));
        assert_eq!(format_backup_list(&[], now, true), "No backups found.");
    }

    #[test]
    fn test_cleanup_report_lists_failures() {
        let report = CleanupReport {
            deleted: vec!["a".into(), "b".into()],
            skipped: vec![],
            failures: vec![CleanupFailure {
                identifier: "c".into(),
                error: "permission denied".into(),
            }],
        };

        let output = format_cleanup_report(&report);

        assert!(output.starts_with("Deleted 2 artifact(s), 1 failed."));
        assert!(output.contains("failed: c: permission denied"));
    }
}
