//! Foreign-key candidate selection.

use serde::{Deserialize, Serialize};

/// Suffix marking a foreign-key-shaped column.
pub const DEFAULT_FOREIGN_KEY_SUFFIX: &str = "_id";

/// Rule deciding which columns are foreign-key candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Required column suffix.
    pub suffix: String,
    /// Columns never considered, even when they carry the suffix.
    #[serde(default)]
    pub skip: Vec<String>,
}

impl Requirement {
    /// Create a requirement with the given suffix and no skipped columns.
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            skip: Vec::new(),
        }
    }

    /// Never consider the given column.
    pub fn with_skip(mut self, column: impl Into<String>) -> Self {
        self.skip.push(column.into());
        self
    }

    /// Check if the requirement can select anything.
    pub fn is_fulfilled(&self) -> bool {
        !self.suffix.is_empty()
    }

    /// Check if a column is a foreign-key candidate.
    pub fn is_candidate(&self, column: &str) -> bool {
        column.len() > self.suffix.len()
            && column.ends_with(&self.suffix)
            && !self.skip.iter().any(|s| s == column)
    }

    /// Name left after stripping the suffix.
    pub fn referenced_name<'a>(&self, column: &'a str) -> &'a str {
        column.strip_suffix(self.suffix.as_str()).unwrap_or(column)
    }
}

impl Default for Requirement {
    fn default() -> Self {
        Self::new(DEFAULT_FOREIGN_KEY_SUFFIX)
    }
}
