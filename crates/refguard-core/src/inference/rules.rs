//! Exclusion and override tables consulted during inference.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::store::RELATION_TABLE;

/// Owning-table prefixes skipped unless the rules say otherwise: flight search
/// caches, background job bookkeeping and the relation table itself.
pub const DEFAULT_CACHE_PREFIXES: [&str; 3] = ["flight_caching", "job_worker", RELATION_TABLE];

/// Hand-maintained knowledge the naming convention cannot express.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionRules {
    /// Foreign keys whose target table cannot be derived from the column
    /// name (`destination_airport_id -> airport`). Included.
    pub overrides: BTreeMap<String, String>,
    /// Foreign keys whose target lives outside the registered schema.
    /// Excluded.
    pub not_applicable: BTreeMap<String, String>,
    /// Foreign-key-shaped columns of unknown origin. Excluded.
    pub unknown: BTreeSet<String>,
    /// Owning-table prefixes of cache and worker tables. Excluded.
    pub cache_prefixes: Vec<String>,
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self {
            overrides: BTreeMap::new(),
            not_applicable: BTreeMap::new(),
            unknown: BTreeSet::new(),
            cache_prefixes: DEFAULT_CACHE_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl ExclusionRules {
    /// Create rules with the default cache blocklist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `column` to `table` regardless of its name.
    pub fn with_override(mut self, column: impl Into<String>, table: impl Into<String>) -> Self {
        self.overrides.insert(column.into(), table.into());
        self
    }

    /// Skip `column`, whose target `table` is not part of the schema.
    pub fn with_not_applicable(
        mut self,
        column: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        self.not_applicable.insert(column.into(), table.into());
        self
    }

    /// Skip `column` entirely.
    pub fn with_unknown(mut self, column: impl Into<String>) -> Self {
        self.unknown.insert(column.into());
        self
    }

    /// Skip every table whose name starts with `prefix`.
    pub fn with_cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if !self.cache_prefixes.contains(&prefix) {
            self.cache_prefixes.push(prefix);
        }
        self
    }

    /// The blocklisted prefix `table` starts with, if any.
    ///
    /// The relation table itself is always blocked.
    pub fn cache_prefix_of<'a>(&'a self, table: &str) -> Option<&'a str> {
        self.cache_prefixes
            .iter()
            .map(String::as_str)
            .filter(|prefix| !prefix.is_empty())
            .find(|prefix| table.starts_with(prefix))
            .or_else(|| table.starts_with(RELATION_TABLE).then_some(RELATION_TABLE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_blocklist() {
        let rules = ExclusionRules::default();
        assert_eq!(rules.cache_prefix_of("relation_schema"), Some("relation_schema"));
        assert_eq!(rules.cache_prefix_of("flight_caching_leg"), Some("flight_caching"));
        assert_eq!(rules.cache_prefix_of("job_worker_run"), Some("job_worker"));
        assert_eq!(rules.cache_prefix_of("city"), None);
    }

    #[test]
    fn test_relation_table_blocked_without_defaults() {
        let rules: ExclusionRules =
            serde_json::from_str(r#"{"cache_prefixes": ["flight_caching"]}"#).unwrap();

        assert_eq!(
            rules.cache_prefix_of("flight_caching_segment"),
            Some("flight_caching")
        );
        assert_eq!(rules.cache_prefix_of("relation_schema"), Some("relation_schema"));
    }

    #[test]
    fn test_builder() {
        let rules = ExclusionRules::new()
            .with_override("destination_airport_id", "airport")
            .with_not_applicable("bank_account_id", "bank_account")
            .with_unknown("agency_id")
            .with_cache_prefix("sync_queue")
            .with_cache_prefix("sync_queue");

        assert_eq!(rules.overrides["destination_airport_id"], "airport");
        assert!(rules.not_applicable.contains_key("bank_account_id"));
        assert!(rules.unknown.contains("agency_id"));
        assert_eq!(
            rules.cache_prefixes,
            vec!["flight_caching", "job_worker", "relation_schema", "sync_queue"]
        );
    }
}
