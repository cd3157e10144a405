//! Snippet model
//!
//! A named shell command with free-form description and comma-separated tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stored command snippet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    /// Row id assigned by the store
    pub id: i64,

    /// Short, descriptive name
    pub name: String,

    /// Longer description of the snippet's purpose
    #[serde(default)]
    pub description: String,

    /// The command to execute
    pub command_text: String,

    /// Comma-separated tags
    #[serde(default)]
    pub tags: String,

    /// When the snippet was last copied or run
    pub last_used: DateTime<Utc>,

    /// When the snippet was created
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating or editing a snippet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewSnippet {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub command_text: String,
    #[serde(default)]
    pub tags: String,
}

impl NewSnippet {
    /// Create a snippet draft with just a name and command
    pub fn new(name: impl Into<String>, command_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command_text: command_text.into(),
            ..Self::default()
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the comma-separated tags
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    /// Validate the draft
    pub fn validate(&self) -> Result<(), SnippetValidationError> {
        if self.name.trim().is_empty() {
            return Err(SnippetValidationError::EmptyName);
        }

        if self.name.len() > 200 {
            return Err(SnippetValidationError::NameTooLong(self.name.len()));
        }

        if self.command_text.trim().is_empty() {
            return Err(SnippetValidationError::EmptyCommand);
        }

        Ok(())
    }
}

impl Snippet {
    /// Individual tags, trimmed, empty entries dropped
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Editable fields of this snippet
    pub fn to_draft(&self) -> NewSnippet {
        NewSnippet {
            name: self.name.clone(),
            description: self.description.clone(),
            command_text: self.command_text.clone(),
            tags: self.tags.clone(),
        }
    }
}

impl fmt::Display for Snippet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Validation errors for snippets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnippetValidationError {
    EmptyName,
    NameTooLong(usize),
    EmptyCommand,
}

impl fmt::Display for SnippetValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Snippet name cannot be empty"),
            Self::NameTooLong(len) => {
                write!(f, "Snippet name too long ({} chars, max 200)", len)
            }
            Self::EmptyCommand => write!(f, "Snippet command cannot be empty"),
        }
    }
}

impl std::error::Error for SnippetValidationError {}
