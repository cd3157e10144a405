//! Storage layer for Snippet Vault
//!
//! The live store is a single SQLite file. Everything else on disk
//! (snapshots, backups, settings) goes through the atomic helpers in
//! `file_io`.

pub mod file_io;
pub mod store;

pub use file_io::{copy_file_atomic, read_json_required, write_json_atomic};
pub use store::{verify_store_file, BatchInsert, SnippetStore};
