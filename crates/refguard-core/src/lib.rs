//! refguard core: relation inference and delete protection.
//!
//! Foreign keys are inferred from the column names of the registered tables
//! and persisted as a relation snapshot. Delete-style requests are mapped to
//! a source table through route policies, and refused while any live
//! dependent row still references the targeted rows.

pub mod catalog;
pub mod config;
pub mod error;
pub mod guard;
pub mod inference;
pub mod policy;
pub mod protection;
pub mod resolver;
pub mod store;
pub mod validate;

pub use catalog::{ColumnDef, Requirement, SchemaRegistry, TableDef};
pub use config::{PolicyDecl, PolicyRoute, ProtectionFile};
pub use error::{Error, Report, ResolveError};
pub use guard::{build_protection_query, DeleteGuard, Verdict};
pub use inference::{migrate_relations, ExclusionRules, InferenceEngine, MigrationOutcome};
pub use policy::{EntityPolicy, PolicyRegistry, ServicePrefix};
pub use protection::RouteProtection;
pub use resolver::{DeleteRequest, DependentTableMap, RouteResolver};
pub use store::{RelationRecord, RelationStore, SnapshotStatus, SqliteStore};
pub use validate::{load_routes, MappingRoute};

#[cfg(feature = "postgres")]
pub use store::PostgresStore;
