//! Core data models for Snippet Vault
//!
//! The snippet itself is a thin record; the interesting state lives in the
//! backup module.

pub mod snippet;

pub use snippet::{NewSnippet, Snippet, SnippetValidationError};
