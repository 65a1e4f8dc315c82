//! Relation store: persisted relation snapshots and raw guard queries.
//!
//! The store is the only component that talks to the relational database.
//! [`SqliteStore`] backs embedded deployments and tests; `PostgresStore`
//! (feature `postgres`) backs server deployments.

mod record;
mod sqlite;

#[cfg(feature = "postgres")]
mod postgres;

pub use record::{RelationRecord, SnapshotStatus, PRIMARY_KEY_COLUMN};
pub use sqlite::SqliteStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use async_trait::async_trait;

use crate::error::Error;

/// Name of the table holding relation snapshots.
pub const RELATION_TABLE: &str = "relation_schema";

/// Records inserted per statement when publishing a snapshot.
pub const PUBLISH_BATCH_SIZE: usize = 100;

/// Access to the relational database backing the protection layer.
#[async_trait]
pub trait RelationStore: Send + Sync {
    /// Create the relation table if it does not exist.
    async fn ensure_schema(&self) -> Result<(), Error>;

    /// Publish a relation snapshot in a single transaction.
    ///
    /// With `replace` set, live records of the previous snapshot are removed
    /// first. Records that already exist are not duplicated. On failure nothing
    /// changes. Returns the number of newly inserted records.
    async fn publish_snapshot(
        &self,
        records: &[RelationRecord],
        replace: bool,
    ) -> Result<usize, Error>;

    /// Whether a snapshot exists and when it was last updated.
    async fn snapshot_status(&self) -> Result<SnapshotStatus, Error>;

    /// Live records whose source table is `source_table`.
    async fn relations_for(&self, source_table: &str) -> Result<Vec<RelationRecord>, Error>;

    /// All live records.
    async fn all_relations(&self) -> Result<Vec<RelationRecord>, Error>;

    /// Execute raw aggregate SQL returning a single integer (NULL reads as 0).
    async fn query_total(&self, sql: &str) -> Result<i64, Error>;

    /// Check whether a table exists.
    async fn table_exists(&self, table: &str) -> Result<bool, Error>;

    /// List user tables.
    async fn list_tables(&self) -> Result<Vec<String>, Error>;

    /// Columns of a table, or `None` when the table does not exist.
    async fn table_columns(&self, table: &str) -> Result<Option<Vec<String>>, Error>;
}

/// Quote an SQL identifier with double quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Current time in microseconds since the Unix epoch.
pub(crate) fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("city"), "\"city\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
