//! Relation records and snapshot metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Primary-key column every relation points at.
pub const PRIMARY_KEY_COLUMN: &str = "id";

/// A directed reference edge: `used_by_table.used_by_column` points at
/// `table_source.column_source`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationRecord {
    /// Referenced (parent) table.
    pub table_source: String,
    /// Referenced column, always the primary key.
    pub column_source: String,
    /// Dependent (child) table.
    pub used_by_table: String,
    /// Foreign-key column on the dependent table.
    pub used_by_column: String,
}

impl RelationRecord {
    /// Create an edge pointing at the primary key of `table_source`.
    pub fn new(
        table_source: impl Into<String>,
        used_by_table: impl Into<String>,
        used_by_column: impl Into<String>,
    ) -> Self {
        Self {
            table_source: table_source.into(),
            column_source: PRIMARY_KEY_COLUMN.to_string(),
            used_by_table: used_by_table.into(),
            used_by_column: used_by_column.into(),
        }
    }
}

/// Presence and age of the published relation snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotStatus {
    /// Whether at least one live record exists.
    pub present: bool,
    /// Newest update time among live records.
    pub last_updated: Option<DateTime<Utc>>,
}

impl SnapshotStatus {
    /// Build a status from a live-record count and the newest `updated_at`
    /// (microseconds since the Unix epoch).
    pub fn from_parts(count: i64, last_updated_micros: Option<i64>) -> Self {
        Self {
            present: count > 0,
            last_updated: last_updated_micros.and_then(DateTime::from_timestamp_micros),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_points_at_primary_key() {
        let record = RelationRecord::new("country", "city", "country_id");
        assert_eq!(record.column_source, "id");
        assert_eq!(record.table_source, "country");
    }

    #[test]
    fn test_status_from_parts() {
        let empty = SnapshotStatus::from_parts(0, None);
        assert!(!empty.present);
        assert!(empty.last_updated.is_none());

        let status = SnapshotStatus::from_parts(3, Some(1_700_000_000_000_000));
        assert!(status.present);
        assert_eq!(status.last_updated.unwrap().timestamp(), 1_700_000_000);
    }
}
