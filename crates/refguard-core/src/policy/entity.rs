//! Per-entity dependent policy.

use serde::{Deserialize, Serialize};

/// Which dependents of a source table are checked before a delete.
///
/// When `required` is non-empty only those dependents are checked and
/// `ignored` is never evaluated. Otherwise every dependent except the
/// `ignored` ones is checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityPolicy {
    /// Table whose rows the protected route deletes.
    pub source: String,
    /// Exhaustive list of dependents to check.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Dependents never checked.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored: Vec<String>,
}

impl EntityPolicy {
    /// Check every dependent of `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Check only the given dependents.
    pub fn with_required<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(tables.into_iter().map(Into::into));
        self
    }

    /// Never check the given dependents.
    pub fn with_ignored<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored.extend(tables.into_iter().map(Into::into));
        self
    }

    /// Whether the policy lists its dependents exhaustively.
    pub fn is_exhaustive(&self) -> bool {
        !self.required.is_empty()
    }

    /// Whether a dependent table is checked under this policy.
    pub fn checks(&self, table: &str) -> bool {
        if self.is_exhaustive() {
            self.required.iter().any(|t| t == table)
        } else {
            !self.ignored.iter().any(|t| t == table)
        }
    }
}
