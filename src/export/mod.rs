//! Export module for Snippet Vault
//!
//! Provides a portable JSON export of all snippets and the matching import.

pub mod json;

pub use json::{export_json, import_json, read_export, ImportStats, SnippetExport, EXPORT_VERSION};
