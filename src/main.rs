use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use snippet_vault::cli::{
    handle_backup_command, handle_export, handle_import, handle_snapshot_command,
    handle_snippet_command, BackupCommands, SnapshotCommands, SnippetCommands,
};
use snippet_vault::config::{Settings, VaultPaths};
use snippet_vault::services::SnippetService;

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "SNIPPETS_LOG";

#[derive(Parser)]
#[command(
    name = "snippets",
    version,
    about = "Command snippet vault with automatic snapshots and backups",
    long_about = "Snippet Vault keeps reusable shell commands in a local SQLite store. \
                  Every change is bracketed by a before/after snapshot so it can be \
                  undone, and manual backups can be taken and restored at any time."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Snippet management commands
    #[command(subcommand)]
    Snippet(SnippetCommands),

    /// Manual backup commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Per-operation snapshot commands
    #[command(subcommand)]
    Snapshot(SnapshotCommands),

    /// Export all snippets to a JSON file
    Export {
        /// Output file path
        output: PathBuf,
    },

    /// Import snippets from a JSON export
    Import {
        /// Input file path
        input: PathBuf,
        /// Remove existing snippets first
        #[arg(long)]
        replace: bool,
    },

    /// Initialize a new vault
    Init,

    /// Show current configuration and paths
    Config,
}

fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "snippet_vault=info,snippets=info",
        2 => "snippet_vault=debug,snippets=debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Initialize paths and settings
    let paths = VaultPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    let Some(command) = cli.command else {
        println!("Snippet Vault - reusable commands with undo");
        println!();
        println!("Run 'snippets --help' for usage information.");
        return Ok(());
    };

    match command {
        Commands::Init => {
            println!("Initializing Snippet Vault at: {}", paths.base_dir().display());
            paths.ensure_directories()?;
            settings.save(&paths)?;
            SnippetService::open(&paths, &settings)?;
            println!("Initialization complete!");
            println!();
            println!("Add your first snippet with:");
            println!("  snippets snippet add <name> <command>");
        }
        Commands::Config => {
            println!("Snippet Vault Configuration");
            println!("===========================");
            println!("Base directory:     {}", paths.base_dir().display());
            println!("Database:           {}", paths.database_file().display());
            println!("Manual backups:     {}", paths.manual_backup_dir().display());
            println!("Snapshots:          {}", paths.snapshot_dir().display());
            println!("Settings file:      {}", paths.settings_file().display());
            println!();
            println!("Settings:");
            println!("  Manual backups kept:    {}", settings.backup.manual_keep_count);
            println!("  Snapshots kept:         {}", settings.backup.snapshot_keep_count);
            println!("  Pending grace (secs):   {}", settings.backup.pending_grace_secs);
            println!(
                "  Safety backup on restore: {}",
                settings.backup.safety_backup_on_restore
            );
            println!(
                "  Auto snapshot cleanup:  {}",
                settings.backup.auto_cleanup_snapshots
            );
            println!("  Duplicate names:        {}", settings.allow_duplicate_names);
        }
        Commands::Snippet(cmd) => {
            let mut service = SnippetService::open(&paths, &settings)?;
            handle_snippet_command(&mut service, cmd)?;
        }
        Commands::Backup(cmd) => {
            let mut service = SnippetService::open(&paths, &settings)?;
            handle_backup_command(&mut service, cmd)?;
        }
        Commands::Snapshot(cmd) => {
            let mut service = SnippetService::open(&paths, &settings)?;
            handle_snapshot_command(&mut service, cmd)?;
        }
        Commands::Export { output } => {
            let service = SnippetService::open(&paths, &settings)?;
            handle_export(&service, &output)?;
        }
        Commands::Import { input, replace } => {
            let mut service = SnippetService::open(&paths, &settings)?;
            handle_import(&mut service, &input, replace)?;
        }
    }

    Ok(())
}
