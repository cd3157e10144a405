//! Snippet CLI commands
//!
//! Implements CLI commands for snippet management.

use clap::Subcommand;

use crate::display::{format_snippet_details, format_snippet_list};
use crate::error::{VaultError, VaultResult};
use crate::models::{NewSnippet, Snippet};
use crate::services::{SnapshotCapture, SnippetService};

/// Snippet subcommands
#[derive(Subcommand)]
pub enum SnippetCommands {
    /// Add a new snippet
    Add {
        /// Snippet name
        name: String,
        /// Command text
        command: String,
        /// Description
        #[arg(short, long)]
        description: Option<String>,
        /// Comma-separated tags
        #[arg(short, long)]
        tags: Option<String>,
    },
    /// List snippets, optionally filtered
    List {
        /// Text to look for in name, description, command or tags
        #[arg(short, long)]
        search: Option<String>,
        /// Only show snippets with one of these tags (repeatable or comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tag: Vec<String>,
    },
    /// List every tag in use
    Tags,
    /// Show snippet details
    Show {
        /// Snippet name or ID
        snippet: String,
        /// Mark the snippet as used
        #[arg(long)]
        used: bool,
    },
    /// Edit a snippet
    Update {
        /// Snippet name or ID
        snippet: String,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        /// New command text
        #[arg(short, long)]
        command: Option<String>,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
        /// New comma-separated tags
        #[arg(short, long)]
        tags: Option<String>,
    },
    /// Delete a snippet
    Delete {
        /// Snippet name or ID
        snippet: String,
    },
}

/// Handle a snippet command
pub fn handle_snippet_command(service: &mut SnippetService, cmd: SnippetCommands) -> VaultResult<()> {
    match cmd {
        SnippetCommands::Add {
            name,
            command,
            description,
            tags,
        } => {
            let mut draft = NewSnippet::new(name, command);
            if let Some(description) = description {
                draft = draft.with_description(description);
            }
            if let Some(tags) = tags {
                draft = draft.with_tags(tags);
            }

            let added = service.add(draft)?;
            println!("Added snippet: {} (ID {})", added.value.name, added.value.id);
            report_capture(&added.snapshot);
        }

        SnippetCommands::List { search, tag } => {
            let snippets = match search {
                None if tag.is_empty() => service.store().list()?,
                search => service.store().search(search.as_deref().unwrap_or(""), &tag)?,
            };
            println!("{}", format_snippet_list(&snippets));
        }

        SnippetCommands::Tags => {
            let tags = service.store().tags()?;
            if tags.is_empty() {
                println!("No tags found.");
            } else {
                for tag in &tags {
                    println!("{}", tag);
                }
            }
        }

        SnippetCommands::Show { snippet, used } => {
            let found = find_snippet(service, &snippet)?;
            if used {
                service.record_usage(found.id)?;
            }
            print!("{}", format_snippet_details(&found));
        }

        SnippetCommands::Update {
            snippet,
            name,
            command,
            description,
            tags,
        } => {
            let existing = find_snippet(service, &snippet)?;
            if name.is_none() && command.is_none() && description.is_none() && tags.is_none() {
                println!("Nothing to update.");
                return Ok(());
            }

            let mut draft = existing.to_draft();
            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(command) = command {
                draft.command_text = command;
            }
            if let Some(description) = description {
                draft.description = description;
            }
            if let Some(tags) = tags {
                draft.tags = tags;
            }

            let updated = service.update(existing.id, draft)?;
            println!("Updated snippet: {}", updated.value.name);
            report_capture(&updated.snapshot);
        }

        SnippetCommands::Delete { snippet } => {
            let existing = find_snippet(service, &snippet)?;
            let deleted = service.delete(existing.id)?;
            println!("Deleted snippet: {}", deleted.value.name);
            report_capture(&deleted.snapshot);
        }
    }

    Ok(())
}

fn find_snippet(service: &SnippetService, identifier: &str) -> VaultResult<Snippet> {
    service
        .find(identifier)?
        .ok_or_else(|| VaultError::snippet_not_found(identifier))
}

fn report_capture(capture: &SnapshotCapture) {
    match capture {
        SnapshotCapture::Completed { snapshot_id } => {
            println!("Snapshot: {}", snapshot_id);
        }
        SnapshotCapture::Incomplete { snapshot_id, error } => {
            eprintln!(
                "Warning: snapshot {} has no after-image ({}). The change was saved.",
                snapshot_id, error
            );
        }
    }
}
