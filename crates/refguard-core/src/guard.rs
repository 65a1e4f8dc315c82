//! Delete guard: blocks deletes of rows still referenced by live dependents.
//!
//! One aggregate query counts the non-deleted dependent rows across every
//! `(table, column)` pair of a [`DependentTableMap`]. Identifiers are typed
//! UUIDs, so inlining them as literals cannot inject SQL.

use tracing::debug;
use uuid::Uuid;

use crate::error::Error;
use crate::resolver::DependentTableMap;
use crate::store::{quote_ident, RelationStore};

/// Soft-delete marker column every dependent table carries.
pub const SOFT_DELETE_COLUMN: &str = "deleted_at";

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No live dependent row references the targeted rows.
    Allowed,
    /// `total` live dependent rows reference the targeted rows.
    Blocked { total: i64 },
}

impl Verdict {
    /// Whether the delete must be refused.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Blocked { .. })
    }
}

/// Build the aggregate count query for `dependents` and `ids`.
///
/// Returns `None` when there is nothing to check.
pub fn build_protection_query(dependents: &DependentTableMap, ids: &[Uuid]) -> Option<String> {
    if dependents.is_empty() || ids.is_empty() {
        return None;
    }

    let id_list = ids
        .iter()
        .map(|id| format!("'{}'", id))
        .collect::<Vec<_>>()
        .join(",");
    let deleted_at = quote_ident(SOFT_DELETE_COLUMN);

    let counts = dependents
        .pairs()
        .map(|(table, column)| {
            let table = quote_ident(table);
            format!(
                "SELECT COUNT(*) AS total FROM {table} WHERE {table}.{column} IN ({ids}) AND {table}.{deleted_at} IS NULL",
                table = table,
                column = quote_ident(column),
                ids = id_list,
                deleted_at = deleted_at,
            )
        })
        .collect::<Vec<_>>();

    Some(format!(
        "SELECT CAST(COALESCE(SUM(\"s\".\"total\"), 0) AS BIGINT) AS \"total\" FROM ({}) \"s\"",
        counts.join(" UNION ALL ")
    ))
}

/// Counts live dependents through a relation store.
pub struct DeleteGuard<'a> {
    store: &'a dyn RelationStore,
}

impl<'a> DeleteGuard<'a> {
    /// Create a guard.
    pub fn new(store: &'a dyn RelationStore) -> Self {
        Self { store }
    }

    /// Decide whether the rows `ids` may be deleted.
    ///
    /// No query is issued for an empty map or an empty id list.
    pub async fn check(&self, dependents: &DependentTableMap, ids: &[Uuid]) -> Result<Verdict, Error> {
        let Some(sql) = build_protection_query(dependents, ids) else {
            return Ok(Verdict::Allowed);
        };

        let total = self.store.query_total(&sql).await?;
        debug!(
            dependents = dependents.len(),
            ids = ids.len(),
            total = total,
            "counted dependent rows"
        );

        if total > 0 {
            Ok(Verdict::Blocked { total })
        } else {
            Ok(Verdict::Allowed)
        }
    }
}
