//! Snapshot CLI commands
//!
//! Lists, inspects, restores and prunes the per-operation snapshots taken
//! around every snippet change.

use clap::Subcommand;

use crate::backup::SnapshotImage;
use crate::display::{format_cleanup_report, format_snapshot_details, format_snapshot_list};
use crate::error::VaultResult;
use crate::services::SnippetService;

/// Snapshot subcommands
#[derive(Subcommand)]
pub enum SnapshotCommands {
    /// List recent snapshots
    List {
        /// Number of snapshots to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show snapshot details
    Show {
        /// Snapshot ID
        id: String,
    },

    /// Restore the store from a snapshot
    Restore {
        /// Snapshot ID
        id: String,

        /// Restore the state before the operation (default)
        #[arg(long, conflicts_with = "after")]
        before: bool,

        /// Restore the state after the operation
        #[arg(long)]
        after: bool,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Delete old snapshots according to retention policy
    Prune {
        /// Number of snapshots to keep (defaults to the configured count)
        #[arg(short, long, allow_negative_numbers = true)]
        keep: Option<i64>,
    },
}

/// Handle a snapshot command
pub fn handle_snapshot_command(
    service: &mut SnippetService,
    cmd: SnapshotCommands,
) -> VaultResult<()> {
    match cmd {
        SnapshotCommands::List { limit } => {
            let snapshots = service.recent_snapshots(limit)?;
            println!("{}", format_snapshot_list(&snapshots));
        }

        SnapshotCommands::Show { id } => {
            let snapshot = service.snapshots().get(&id)?;
            print!("{}", format_snapshot_details(&snapshot));
        }

        SnapshotCommands::Restore {
            id,
            before: _,
            after,
            force,
        } => {
            let image = SnapshotImage::from_use_before(!after);
            let snapshot = service.snapshots().get(&id)?;
            // Fails early when the after-image was never captured
            snapshot.image_path(image)?;

            print!("{}", format_snapshot_details(&snapshot));
            println!();

            if !force {
                println!(
                    "WARNING: This will replace ALL current snippets with the {} image!",
                    image
                );
                println!("To proceed, run again with --force flag:");
                println!("  snippets snapshot restore {} --{} --force", id, image);
                return Ok(());
            }

            let report = service.restore_snapshot(&id, image, None)?;
            println!("Restore complete!");
            println!("{}", report.summary());
        }

        SnapshotCommands::Prune { keep } => {
            let report = service.cleanup_snapshots(keep)?;
            print!("{}", format_cleanup_report(&report));
        }
    }

    Ok(())
}
