//! SQLite snippet store
//!
//! Owns the single live database file. The backup layer only ever sees its
//! path: callers close the store before a restore swaps the file and reopen
//! it afterwards.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension, Row};

use crate::error::{VaultError, VaultResult};
use crate::models::{NewSnippet, Snippet};

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS snippets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    command_text TEXT NOT NULL,
    tags TEXT,
    last_used DATETIME DEFAULT CURRENT_TIMESTAMP,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    description TEXT
);
";

const SELECT_COLUMNS: &str =
    "SELECT id, name, description, command_text, tags, last_used, created_at FROM snippets";

/// Counts from a batch insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchInsert {
    pub imported: usize,
    pub failed: usize,
}

/// Handle on the live snippet database
pub struct SnippetStore {
    path: PathBuf,
    conn: Option<Connection>,
}

impl SnippetStore {
    /// Open (creating if needed) the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> VaultResult<Self> {
        let mut store = Self {
            path: path.into(),
            conn: None,
        };
        store.reopen()?;
        Ok(store)
    }

    /// Path of the live database file
    pub fn current_file_path(&self) -> &Path {
        &self.path
    }

    /// Whether a connection is currently held
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Close the connection so the file can be copied or replaced
    pub fn close(&mut self) -> VaultResult<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| {
                VaultError::Database(format!(
                    "Failed to close {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
            tracing::debug!(path = %self.path.display(), "store closed");
        }
        Ok(())
    }

    /// Open a fresh connection, creating the schema when missing
    pub fn reopen(&mut self) -> VaultResult<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VaultError::Io(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(&self.path).map_err(|e| {
            VaultError::Database(format!("Failed to open {}: {}", self.path.display(), e))
        })?;
        conn.execute_batch(SCHEMA)?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, description) VALUES (?1, ?2)",
            params![SCHEMA_VERSION, "Initial snippets schema"],
        )?;

        tracing::debug!(path = %self.path.display(), "store opened");
        self.conn = Some(conn);
        Ok(())
    }

    fn conn(&self) -> VaultResult<&Connection> {
        self.conn.as_ref().ok_or_else(|| {
            VaultError::Database(format!("Store {} is closed", self.path.display()))
        })
    }

    /// Insert a new snippet
    pub fn insert(&self, draft: &NewSnippet) -> VaultResult<Snippet> {
        let now = Utc::now();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO snippets (name, description, command_text, tags, last_used, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                draft.name,
                draft.description,
                draft.command_text,
                draft.tags,
                now,
                now
            ],
        )?;
        let id = conn.last_insert_rowid();

        self.get(id)?
            .ok_or_else(|| VaultError::snippet_not_found(id.to_string()))
    }

    /// Replace the editable fields of an existing snippet
    pub fn update(&self, id: i64, draft: &NewSnippet) -> VaultResult<Snippet> {
        let changed = self.conn()?.execute(
            "UPDATE snippets SET name = ?1, description = ?2, command_text = ?3, tags = ?4
             WHERE id = ?5",
            params![draft.name, draft.description, draft.command_text, draft.tags, id],
        )?;
        if changed == 0 {
            return Err(VaultError::snippet_not_found(id.to_string()));
        }

        self.get(id)?
            .ok_or_else(|| VaultError::snippet_not_found(id.to_string()))
    }

    /// Delete a snippet, returning the removed row
    pub fn delete(&self, id: i64) -> VaultResult<Snippet> {
        let snippet = self
            .get(id)?
            .ok_or_else(|| VaultError::snippet_not_found(id.to_string()))?;
        self.conn()?
            .execute("DELETE FROM snippets WHERE id = ?1", params![id])?;
        Ok(snippet)
    }

    /// Get a snippet by id
    pub fn get(&self, id: i64) -> VaultResult<Option<Snippet>> {
        let snippet = self
            .conn()?
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                snippet_from_row,
            )
            .optional()?;
        Ok(snippet)
    }

    /// All snippets, most recently used first
    pub fn list(&self) -> VaultResult<Vec<Snippet>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY last_used DESC, id DESC",
            SELECT_COLUMNS
        ))?;
        let snippets = stmt
            .query_map([], snippet_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(snippets)
    }

    /// Substring search over name, description, command and tags
    ///
    /// A blank `query` matches everything. Each non-blank entry in `tags`
    /// matches snippets whose tag text contains it; any one tag is enough.
    pub fn search(&self, query: &str, tags: &[String]) -> VaultResult<Vec<Snippet>> {
        let mut sql = format!("{} WHERE 1=1", SELECT_COLUMNS);
        let mut args: Vec<String> = Vec::new();

        let query = query.trim();
        if !query.is_empty() {
            sql.push_str(
                " AND (name LIKE ? OR description LIKE ? OR command_text LIKE ? OR tags LIKE ?)",
            );
            let pattern = format!("%{}%", query);
            args.extend(std::iter::repeat(pattern).take(4));
        }

        let tag_patterns: Vec<String> = tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| format!("%{}%", t))
            .collect();
        if !tag_patterns.is_empty() {
            let clauses = vec!["tags LIKE ?"; tag_patterns.len()].join(" OR ");
            sql.push_str(&format!(" AND ({})", clauses));
            args.extend(tag_patterns);
        }

        sql.push_str(" ORDER BY last_used DESC, id DESC");

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let snippets = stmt
            .query_map(params_from_iter(args.iter()), snippet_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(snippets)
    }

    /// Every distinct tag in use, sorted
    pub fn tags(&self) -> VaultResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT tags FROM snippets WHERE tags IS NOT NULL AND tags != ''")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut tags: Vec<String> = rows
            .iter()
            .flat_map(|raw| raw.split(','))
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    /// Whether another snippet already uses `name`
    pub fn name_exists(&self, name: &str, exclude_id: Option<i64>) -> VaultResult<bool> {
        let found = self
            .conn()?
            .query_row(
                "SELECT id FROM snippets WHERE name = ?1 AND (?2 IS NULL OR id != ?2) LIMIT 1",
                params![name, exclude_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Bump `last_used` for a snippet
    pub fn record_usage(&self, id: i64) -> VaultResult<()> {
        let changed = self.conn()?.execute(
            "UPDATE snippets SET last_used = ?1 WHERE id = ?2",
            params![Utc::now(), id],
        )?;
        if changed == 0 {
            return Err(VaultError::snippet_not_found(id.to_string()));
        }
        Ok(())
    }

    /// Number of stored snippets
    pub fn count(&self) -> VaultResult<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM snippets", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Insert many snippets in one transaction, keeping their timestamps
    ///
    /// Ids are reassigned by the store. Rows that fail validation or the
    /// insert are counted as failed; the rest commit together.
    pub fn insert_batch(
        &mut self,
        snippets: &[Snippet],
        replace_existing: bool,
    ) -> VaultResult<BatchInsert> {
        let path = self.path.clone();
        let conn = self.conn.as_mut().ok_or_else(|| {
            VaultError::Database(format!("Store {} is closed", path.display()))
        })?;
        let tx = conn.transaction()?;

        if replace_existing {
            tracing::info!("clearing existing snippets before import");
            tx.execute("DELETE FROM snippets", [])?;
        }

        let mut outcome = BatchInsert::default();
        for snippet in snippets {
            if let Err(e) = snippet.to_draft().validate() {
                tracing::warn!(name = %snippet.name, error = %e, "skipping invalid snippet");
                outcome.failed += 1;
                continue;
            }

            let inserted = tx.execute(
                "INSERT INTO snippets (name, description, command_text, tags, last_used, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    snippet.name,
                    snippet.description,
                    snippet.command_text,
                    snippet.tags,
                    snippet.last_used,
                    snippet.created_at
                ],
            );
            match inserted {
                Ok(_) => outcome.imported += 1,
                Err(e) => {
                    tracing::warn!(name = %snippet.name, error = %e, "failed to import snippet");
                    outcome.failed += 1;
                }
            }
        }

        tx.commit()?;
        Ok(outcome)
    }
}

fn snippet_from_row(row: &Row<'_>) -> rusqlite::Result<Snippet> {
    Ok(Snippet {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        command_text: row.get(3)?,
        tags: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        last_used: row
            .get::<_, Option<DateTime<Utc>>>(5)?
            .unwrap_or_else(Utc::now),
        created_at: row
            .get::<_, Option<DateTime<Utc>>>(6)?
            .unwrap_or_else(Utc::now),
    })
}

/// Check that `path` holds a readable snippet store
///
/// Opens the file read-only, runs `PRAGMA quick_check` and confirms the
/// `snippets` table is present in the schema.
pub fn verify_store_file(path: &Path) -> VaultResult<()> {
    if !path.is_file() {
        return Err(VaultError::Integrity(format!(
            "{} is not a file",
            path.display()
        )));
    }

    let integrity = |detail: String| {
        VaultError::Integrity(format!("{} failed verification: {}", path.display(), detail))
    };

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| integrity(e.to_string()))?;

    let check: String = conn
        .query_row("PRAGMA quick_check", [], |row| row.get(0))
        .map_err(|e| integrity(e.to_string()))?;
    if check != "ok" {
        return Err(integrity(check));
    }

    let tables: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'snippets'",
            [],
            |row| row.get(0),
        )
        .map_err(|e| integrity(e.to_string()))?;
    if tables == 0 {
        return Err(integrity("missing snippets table".into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (SnippetStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SnippetStore::open(temp_dir.path().join("data").join("snippets.db")).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_insert_and_get() {
        let (store, _temp) = create_test_store();

        let snippet = store
            .insert(&NewSnippet::new("List", "ls -la").with_tags("fs"))
            .unwrap();

        let loaded = store.get(snippet.id).unwrap().unwrap();
        assert_eq!(loaded.name, "List");
        assert_eq!(loaded.command_text, "ls -la");
        assert_eq!(loaded.tags, "fs");
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_update_and_delete() {
        let (store, _temp) = create_test_store();
        let snippet = store.insert(&NewSnippet::new("List", "ls")).unwrap();

        let updated = store
            .update(snippet.id, &NewSnippet::new("List all", "ls -la"))
            .unwrap();
        assert_eq!(updated.name, "List all");

        let removed = store.delete(snippet.id).unwrap();
        assert_eq!(removed.name, "List all");
        assert!(store.get(snippet.id).unwrap().is_none());
    }

    #[test]
    fn test_missing_rows_are_not_found() {
        let (store, _temp) = create_test_store();

        assert!(store.delete(42).unwrap_err().is_not_found());
        assert!(store
            .update(42, &NewSnippet::new("x", "y"))
            .unwrap_err()
            .is_not_found());
        assert!(store.record_usage(42).unwrap_err().is_not_found());
    }

    #[test]
    fn test_search_matches_any_field() {
        let (store, _temp) = create_test_store();
        store
            .insert(&NewSnippet::new("Disk usage", "df -h").with_tags("fs,ops"))
            .unwrap();
        store
            .insert(&NewSnippet::new("Pods", "kubectl get pods").with_description("List k8s pods"))
            .unwrap();
        store
            .insert(&NewSnippet::new("Logs", "journalctl -f").with_tags("ops"))
            .unwrap();

        let names = |found: Vec<Snippet>| -> Vec<String> {
            let mut names: Vec<_> = found.into_iter().map(|s| s.name).collect();
            names.sort();
            names
        };

        assert_eq!(names(store.search("df", &[]).unwrap()), vec!["Disk usage"]);
        assert_eq!(names(store.search("k8s", &[]).unwrap()), vec!["Pods"]);
        assert_eq!(names(store.search("  ", &[]).unwrap()).len(), 3);
        assert_eq!(
            names(store.search("", &["ops".into()]).unwrap()),
            vec!["Disk usage", "Logs"]
        );
        assert_eq!(
            names(store.search("journal", &["ops".into(), " ".into()]).unwrap()),
            vec!["Logs"]
        );
        assert!(store.search("nothing here", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_tags_sorted_and_unique() {
        let (store, _temp) = create_test_store();
        store
            .insert(&NewSnippet::new("a", "echo a").with_tags("ops, fs"))
            .unwrap();
        store
            .insert(&NewSnippet::new("b", "echo b").with_tags("net,ops"))
            .unwrap();
        store.insert(&NewSnippet::new("c", "echo c")).unwrap();

        assert_eq!(store.tags().unwrap(), vec!["fs", "net", "ops"]);
    }

    #[test]
    fn test_name_exists() {
        let (store, _temp) = create_test_store();
        let snippet = store.insert(&NewSnippet::new("List", "ls")).unwrap();

        assert!(store.name_exists("List", None).unwrap());
        assert!(!store.name_exists("List", Some(snippet.id)).unwrap());
        assert!(!store.name_exists("list", None).unwrap());
        assert!(!store.name_exists("Other", None).unwrap());
    }

    #[test]
    fn test_close_and_reopen() {
        let (mut store, _temp) = create_test_store();
        store.insert(&NewSnippet::new("List", "ls")).unwrap();

        store.close().unwrap();
        assert!(!store.is_open());
        assert!(store.list().is_err());

        store.reopen().unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_insert_batch_counts_failures() {
        let (mut store, _temp) = create_test_store();
        store.insert(&NewSnippet::new("Old", "echo old")).unwrap();

        let now = Utc::now();
        let rows = vec![
            Snippet {
                id: 99,
                name: "Good".into(),
                description: String::new(),
                command_text: "echo ok".into(),
                tags: String::new(),
                last_used: now,
                created_at: now,
            },
            Snippet {
                id: 100,
                name: "Bad".into(),
                description: String::new(),
                command_text: "  ".into(),
                tags: String::new(),
                last_used: now,
                created_at: now,
            },
        ];

        let outcome = store.insert_batch(&rows, true).unwrap();
        assert_eq!(outcome, BatchInsert { imported: 1, failed: 1 });

        let names: Vec<_> = store.list().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Good"]);
    }

    #[test]
    fn test_verify_store_file() {
        let (mut store, temp) = create_test_store();
        store.close().unwrap();
        assert!(verify_store_file(store.current_file_path()).is_ok());

        let garbage = temp.path().join("garbage.db");
        std::fs::write(&garbage, b"definitely not sqlite").unwrap();
        assert!(matches!(
            verify_store_file(&garbage),
            Err(VaultError::Integrity(_))
        ));

        let empty = temp.path().join("empty.db");
        std::fs::write(&empty, b"").unwrap();
        assert!(verify_store_file(&empty).is_err());

        assert!(verify_store_file(&temp.path().join("missing.db")).is_err());
    }
}
