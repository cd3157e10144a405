//! JSON export and import
//!
//! A portable, human-readable dump of every snippet. Unlike manual backups
//! it survives schema changes and can be merged into another store.

use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};
use crate::models::Snippet;
use crate::storage::SnippetStore;

/// Current export format version
pub const EXPORT_VERSION: u32 = 1;

/// Full snippet export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnippetExport {
    /// Format version for compatibility checking
    pub version: u32,

    /// Export timestamp
    pub exported_at: DateTime<Utc>,

    /// All snippets, oldest first
    pub snippets: Vec<Snippet>,
}

impl SnippetExport {
    /// Build an export from the store
    pub fn from_store(store: &SnippetStore) -> VaultResult<Self> {
        let mut snippets = store.list()?;
        snippets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(Self {
            version: EXPORT_VERSION,
            exported_at: Utc::now(),
            snippets,
        })
    }

    /// Validate the export structure
    pub fn validate(&self) -> Result<(), String> {
        if self.version != EXPORT_VERSION {
            return Err(format!(
                "Export version mismatch: expected {}, got {}",
                EXPORT_VERSION, self.version
            ));
        }
        Ok(())
    }
}

/// Counts from an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub total: usize,
    pub imported: usize,
    pub failed: usize,
}

/// Export every snippet as JSON
pub fn export_json<W: Write>(store: &SnippetStore, writer: &mut W) -> VaultResult<usize> {
    let export = SnippetExport::from_store(store)?;
    serde_json::to_writer_pretty(writer, &export)?;
    Ok(export.snippets.len())
}

/// Parse and validate an export
pub fn read_export<R: Read>(reader: R) -> VaultResult<SnippetExport> {
    let export: SnippetExport = serde_json::from_reader(reader)
        .map_err(|e| VaultError::Json(format!("Invalid export format: {}", e)))?;
    export.validate().map_err(VaultError::Validation)?;
    Ok(export)
}

/// Insert the exported snippets into the store
///
/// With `replace_existing` the current snippets are removed first, in the
/// same transaction.
pub fn import_json(
    store: &mut SnippetStore,
    export: &SnippetExport,
    replace_existing: bool,
) -> VaultResult<ImportStats> {
    export.validate().map_err(VaultError::Validation)?;

    let batch = store.insert_batch(&export.snippets, replace_existing)?;
    let stats = ImportStats {
        total: export.snippets.len(),
        imported: batch.imported,
        failed: batch.failed,
    };

    tracing::info!(
        total = stats.total,
        imported = stats.imported,
        failed = stats.failed,
        "import completed"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewSnippet;
    use tempfile::TempDir;

    fn create_store(temp: &TempDir, name: &str) -> SnippetStore {
        SnippetStore::open(temp.path().join(name)).unwrap()
    }

    #[test]
    fn test_export_and_import_into_fresh_store() {
        let temp = TempDir::new().unwrap();
        let source = create_store(&temp, "a.db");
        source
            .insert(&NewSnippet::new("List", "ls -la").with_tags("fs"))
            .unwrap();
        source.insert(&NewSnippet::new("Disk", "df -h")).unwrap();

        let mut buffer = Vec::new();
        assert_eq!(export_json(&source, &mut buffer).unwrap(), 2);

        let export = read_export(buffer.as_slice()).unwrap();
        let mut target = create_store(&temp, "b.db");
        let stats = import_json(&mut target, &export, false).unwrap();

        assert_eq!(
            stats,
            ImportStats {
                total: 2,
                imported: 2,
                failed: 0
            }
        );
        let names: Vec<_> = target.list().unwrap().into_iter().map(|s| s.name).collect();
        assert!(names.contains(&"List".to_string()));
        assert!(names.contains(&"Disk".to_string()));
    }

    #[test]
    fn test_import_appends_unless_replacing() {
        let temp = TempDir::new().unwrap();
        let mut store = create_store(&temp, "a.db");
        store.insert(&NewSnippet::new("Existing", "true")).unwrap();
        let export = SnippetExport::from_store(&store).unwrap();

        import_json(&mut store, &export, false).unwrap();
        assert_eq!(store.count().unwrap(), 2);

        import_json(&mut store, &export, true).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_read_export_rejects_bad_input() {
        assert!(matches!(
            read_export(&b"{\"snippets\": []}"[..]),
            Err(VaultError::Json(_))
        ));

        let wrong_version = br#"{"version": 9, "exported_at": "2025-01-01T00:00:00Z", "snippets": []}"#;
        assert!(matches!(
            read_export(&wrong_version[..]),
            Err(VaultError::Validation(_))
        ));
    }
}
