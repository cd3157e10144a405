//! CLI commands for JSON export and import

use std::path::Path;

use crate::error::VaultResult;
use crate::services::SnippetService;

/// Handle `snippets export <file>`
pub fn handle_export(service: &SnippetService, output: &Path) -> VaultResult<()> {
    let count = service.export_to(output)?;
    println!("Exported {} snippet(s) to {}", count, output.display());
    Ok(())
}

/// Handle `snippets import <file>`
pub fn handle_import(service: &mut SnippetService, input: &Path, replace: bool) -> VaultResult<()> {
    if replace {
        println!("Existing snippets will be replaced.");
    }

    let (backup, stats) = service.import_from(input, replace)?;
    println!("Backup of previous store: {}", backup.filename);
    println!(
        "Imported {} of {} snippet(s) from {}",
        stats.imported,
        stats.total,
        input.display()
    );
    if stats.failed > 0 {
        println!("{} snippet(s) could not be imported.", stats.failed);
    }
    Ok(())
}
