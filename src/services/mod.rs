//! Service layer for Snippet Vault
//!
//! The service layer provides business logic on top of the storage layer,
//! wrapping every mutation in a snapshot and coordinating restores with the
//! open store.

pub mod snippet;

pub use snippet::{Mutation, SnapshotCapture, SnippetService};
