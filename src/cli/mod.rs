//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod backup;
pub mod export;
pub mod snapshot;
pub mod snippet;

pub use backup::{handle_backup_command, BackupCommands};
pub use export::{handle_export, handle_import};
pub use snapshot::{handle_snapshot_command, SnapshotCommands};
pub use snippet::{handle_snippet_command, SnippetCommands};
