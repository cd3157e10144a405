//! Backup CLI commands
//!
//! Implements CLI commands for manual backup management.

use clap::Subcommand;

use crate::backup::RetentionPolicy;
use crate::display::{format_backup_list, format_cleanup_report, format_size};
use crate::error::VaultResult;
use crate::services::SnippetService;
use crate::storage::verify_store_file;

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup
    Create,

    /// List all available backups
    List {
        /// Show detailed information
        #[arg(short = 'd', long = "detailed")]
        detailed: bool,
    },

    /// Restore from a backup
    Restore {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,

        /// Do not take a safety backup of the current store first
        #[arg(long)]
        no_safety: bool,
    },

    /// Delete old backups according to retention policy
    Prune {
        /// Number of backups to keep (defaults to the configured count)
        #[arg(short, long, allow_negative_numbers = true)]
        keep: Option<i64>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Handle a backup command
pub fn handle_backup_command(service: &mut SnippetService, cmd: BackupCommands) -> VaultResult<()> {
    match cmd {
        BackupCommands::Create => {
            println!("Creating backup...");
            let backup = service.create_backup()?;
            println!("Backup created: {}", backup.filename);
            println!("Location: {}", backup.path.display());
        }

        BackupCommands::List { detailed } => {
            let backups = service.list_backups()?;

            if backups.is_empty() {
                println!("No backups found.");
                println!("Create one with: snippets backup create");
                return Ok(());
            }

            println!("Available Backups");
            println!("=================");
            println!();
            print!("{}", format_backup_list(&backups, chrono::Utc::now(), detailed));
        }

        BackupCommands::Restore {
            backup,
            force,
            no_safety,
        } => {
            let backup_path = service.backups().resolve(&backup)?;
            verify_store_file(&backup_path)?;
            let size = std::fs::metadata(&backup_path)?.len();

            println!("Backup Information");
            println!("==================");
            println!("File: {}", backup_path.display());
            println!("Size: {}", format_size(size));
            println!("Status: valid");
            println!();

            if !force {
                println!("WARNING: This will overwrite ALL current snippets!");
                println!("To proceed, run again with --force flag:");
                println!("  snippets backup restore {} --force", backup);
                return Ok(());
            }

            println!("Restoring from backup...");
            let keep_safety = if no_safety { Some(false) } else { None };
            let report = service.restore_backup(&backup_path, keep_safety)?;

            println!("Restore complete!");
            println!("{}", report.summary());
        }

        BackupCommands::Prune { keep, force } => {
            let backups = service.list_backups()?;
            let policy = match keep {
                Some(count) => RetentionPolicy::keep_latest(count)?,
                None => service.settings().manual_retention()?,
            };
            let to_delete = backups.len().saturating_sub(policy.keep_count());

            if to_delete == 0 {
                println!("No backups to prune.");
                println!("Current retention policy: {}", policy);
                println!("You have {} backup(s).", backups.len());
                return Ok(());
            }

            println!("Prune Summary");
            println!("=============");
            println!("Retention policy: {}", policy);
            println!("Current backups: {}", backups.len());
            println!("To be deleted: {}", to_delete);
            println!();

            if !force {
                println!("To delete old backups, run again with --force flag:");
                println!("  snippets backup prune --keep {} --force", policy.keep_count());
                return Ok(());
            }

            let report = service.cleanup_backups(keep)?;
            print!("{}", format_cleanup_report(&report));
        }
    }

    Ok(())
}
