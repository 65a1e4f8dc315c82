//! Foreign-key classification and snapshot publishing.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use super::ExclusionRules;
use crate::catalog::{Requirement, SchemaRegistry};
use crate::error::{Error, Report};
use crate::store::{RelationRecord, RelationStore};

/// How a candidate `(owning table, column)` pair was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Target lives outside the registered schema.
    NotApplicable { table: String },
    /// Origin of the column is unknown.
    Unknown,
    /// Owning table is a cache table.
    Cached { prefix: String },
    /// Target taken from the override table.
    Override { table: String },
    /// Target derived by stripping the suffix.
    Convention { table: String },
    /// No rule applies.
    Unresolved,
}

impl Classification {
    /// The referenced table, for included pairs.
    pub fn target(&self) -> Option<&str> {
        match self {
            Classification::Override { table } | Classification::Convention { table } => {
                Some(table)
            }
            _ => None,
        }
    }
}

/// Result of a relation migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOutcome {
    /// Every inferred edge, sorted.
    pub records: Vec<RelationRecord>,
    /// Edges newly written to the store.
    pub inserted: usize,
}

/// Infers relation edges from a schema registry.
pub struct InferenceEngine<'a> {
    registry: &'a SchemaRegistry,
    rules: &'a ExclusionRules,
    requirement: Requirement,
}

impl<'a> InferenceEngine<'a> {
    /// Create an engine with the default `_id` requirement.
    pub fn new(registry: &'a SchemaRegistry, rules: &'a ExclusionRules) -> Self {
        Self {
            registry,
            rules,
            requirement: Requirement::default(),
        }
    }

    /// Use a different candidate requirement.
    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirement = requirement;
        self
    }

    /// Classify one candidate column owned by `table`.
    ///
    /// Rules apply in a fixed order: not applicable, unknown, cache table,
    /// override, naming convention.
    pub fn classify(&self, table: &str, column: &str) -> Classification {
        if let Some(target) = self.rules.not_applicable.get(column) {
            return Classification::NotApplicable {
                table: target.clone(),
            };
        }
        if self.rules.unknown.contains(column) {
            return Classification::Unknown;
        }
        if let Some(prefix) = self.rules.cache_prefix_of(table) {
            return Classification::Cached {
                prefix: prefix.to_string(),
            };
        }
        if let Some(target) = self.rules.overrides.get(column) {
            return Classification::Override {
                table: target.clone(),
            };
        }

        let referenced = self.requirement.referenced_name(column);
        if self.registry.contains(referenced) {
            return Classification::Convention {
                table: referenced.to_string(),
            };
        }

        Classification::Unresolved
    }

    /// Infer every relation edge of the registry.
    ///
    /// Fails with one aggregated [`Error::Inference`] when any candidate is
    /// left unresolved; a partial graph is never returned.
    pub fn infer(&self) -> Result<Vec<RelationRecord>, Error> {
        let mut report = Report::new("infer relations");

        if !self.requirement.is_fulfilled() {
            report.push("foreign key suffix is empty");
            return Err(Error::Inference(report));
        }
        if self.registry.is_empty() {
            report.push("schema registry is empty");
            return Err(Error::Inference(report));
        }

        let candidates = self.registry.candidate_columns(&self.requirement);
        if candidates.is_empty() {
            report.push(format!(
                "no registered column ends with {}",
                self.requirement.suffix
            ));
            return Err(Error::Inference(report));
        }

        let mut records = BTreeSet::new();
        let mut unresolved: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        let mut dangling: BTreeSet<(&str, String)> = BTreeSet::new();

        for (column, tables) in &candidates {
            for table in tables {
                match self.classify(table, column) {
                    Classification::NotApplicable { table: target } => {
                        info!(
                            used_by_column = %column,
                            used_by_table = %table,
                            table_source = %target,
                            "excluded foreign key outside schema"
                        );
                    }
                    Classification::Unknown => {
                        info!(
                            used_by_column = %column,
                            used_by_table = %table,
                            "excluded foreign key of unknown origin"
                        );
                    }
                    Classification::Cached { prefix } => {
                        info!(
                            used_by_column = %column,
                            used_by_table = %table,
                            prefix = %prefix,
                            "excluded cache table column"
                        );
                    }
                    Classification::Override { table: target }
                        if !self.registry.contains(&target) =>
                    {
                        dangling.insert((column.as_str(), target));
                    }
                    Classification::Override { table: target }
                    | Classification::Convention { table: target } => {
                        debug!(
                            table_source = %target,
                            used_by_table = %table,
                            used_by_column = %column,
                            "inferred relation"
                        );
                        records.insert(RelationRecord::new(target, table.as_str(), column.as_str()));
                    }
                    Classification::Unresolved => {
                        unresolved
                            .entry(column.as_str())
                            .or_default()
                            .push(table.as_str());
                    }
                }
            }
        }

        for (column, target) in dangling {
            report.push(format!(
                "override of column {} points at table {}, which is not registered",
                column, target
            ));
        }
        for (column, tables) in unresolved {
            report.push(format!(
                "schema column of column name: {} (used by table: {}), is not found",
                column,
                tables.join(", ")
            ));
        }
        report.into_inference_result()?;

        info!(relations = records.len(), "relation inference complete");
        Ok(records.into_iter().collect())
    }
}

/// Infer relations from `registry` and publish them to `store`.
///
/// With `replace` set the previous snapshot is removed in the same
/// transaction. Nothing is written when inference fails.
pub async fn migrate_relations(
    store: &dyn RelationStore,
    registry: &SchemaRegistry,
    rules: &ExclusionRules,
    replace: bool,
) -> Result<MigrationOutcome, Error> {
    let records = InferenceEngine::new(registry, rules).infer()?;
    let inserted = store.publish_snapshot(&records, replace).await?;

    info!(
        relations = records.len(),
        inserted = inserted,
        replace = replace,
        "published relation snapshot"
    );

    Ok(MigrationOutcome { records, inserted })
}
