//! Snippet Vault - reusable shell commands with undo
//!
//! This library provides the core functionality for the `snippets` CLI: a
//! single-file SQLite snippet store plus the backup machinery that makes
//! every change to it recoverable.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models
//! - `storage`: SQLite store and atomic file helpers
//! - `backup`: Snapshots, manual backups, retention and restore
//! - `services`: Business logic layer
//! - `export`: JSON export and import
//! - `cli`, `display`: command handlers and terminal formatting
//!
//! # Example
//!
//! ```rust,ignore
//! use snippet_vault::config::{Settings, VaultPaths};
//! use snippet_vault::models::NewSnippet;
//! use snippet_vault::services::SnippetService;
//!
//! let paths = VaultPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let mut service = SnippetService::open(&paths, &settings)?;
//! let added = service.add(NewSnippet::new("List", "ls -la"))?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{VaultError, VaultResult};
