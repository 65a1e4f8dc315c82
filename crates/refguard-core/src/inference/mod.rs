//! Relation inference.
//!
//! Discovers foreign-key columns across the registered schema by naming
//! convention, corrected by [`ExclusionRules`], and publishes the resulting
//! edges to a [`RelationStore`](crate::store::RelationStore).

mod engine;
mod rules;

pub use engine::{migrate_relations, Classification, InferenceEngine, MigrationOutcome};
pub use rules::{ExclusionRules, DEFAULT_CACHE_PREFIXES};
