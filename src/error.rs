//! Custom error types for Snippet Vault
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for Snippet Vault operations
#[derive(Error, Debug)]
pub enum VaultError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// SQLite errors from the snippet store
    #[error("Database error: {0}")]
    Database(String),

    /// Validation errors for data models
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// A store image failed its integrity check
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Invalid retention parameters, rejected before anything is deleted
    #[error("Retention error: {0}")]
    Retention(String),

    /// Illegal snapshot state transition
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// The live store could be neither verified nor rolled back
    #[error("FATAL: live store is in an unknown state, manual intervention required: {0}")]
    UnknownState(String),
}

impl VaultError {
    /// Create a "not found" error for snippets
    pub fn snippet_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Snippet",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for snapshots
    pub fn snapshot_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Snapshot",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for backups
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error means the live store needs manual attention
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnknownState(_))
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<rusqlite::Error> for VaultError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for Snippet Vault operations
pub type VaultResult<T> = Result<T, VaultError>;
