//! Core error types.

use std::fmt;

use thiserror::Error;

/// Core errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Declared policy, route table, or schema are inconsistent.
    #[error("configuration error: {0}")]
    Config(Report),

    /// Relation inference could not resolve the full graph.
    #[error("inference error: {0}")]
    Inference(Report),

    /// A request could not be mapped to an entity and identifiers.
    #[error("resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// No relation snapshot has been published yet.
    #[error("no relation schema found, run relation migration first")]
    NotMigrated,

    /// No policy registry has been installed yet.
    #[error("router source is not mapped, map routes first")]
    NotMapped,

    /// A table was reflected that does not exist in the database.
    #[error("table {0} is not registered")]
    TableNotRegistered(String),

    /// SQLite store error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// PostgreSQL store error.
    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Store returned data that does not fit the expected shape.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error is scoped to a single bad request.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Error::Resolve(_))
    }
}

/// Request resolution errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The path identifier is not a non-nil UUID.
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),

    /// The batch body is not a JSON array of identifiers.
    #[error("invalid batch body: {0}")]
    InvalidBody(String),

    /// The batch module does not name an existing table.
    #[error("module {0} is not found")]
    ModuleNotFound(String),
}

/// Aggregated diagnostics of one configuration or inference step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Step that produced the diagnostics.
    pub section: String,
    /// One entry per problem found.
    pub messages: Vec<String>,
}

impl Report {
    /// Create an empty report for a section.
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            messages: Vec::new(),
        }
    }

    /// Add a diagnostic.
    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Append every diagnostic of another report.
    pub fn extend(&mut self, other: Report) {
        self.messages.extend(other.messages);
    }

    /// Check whether no problem was recorded.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Turn a non-empty report into a configuration error.
    pub fn into_config_result(self) -> Result<(), Error> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(self))
        }
    }

    /// Turn a non-empty report into an inference error.
    pub fn into_inference_result(self) -> Result<(), Error> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Inference(self))
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:\n - {}", self.section, self.messages.join(";\n - "))
    }
}
