//! Maps delete-style requests to an entity policy, row identifiers and the
//! dependent tables to check.

use std::collections::{BTreeMap, BTreeSet};

use heck::ToSnakeCase;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, ResolveError};
use crate::policy::{EntityPolicy, PolicyRegistry};
use crate::store::{RelationRecord, RelationStore};

static BATCH_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r".*/batch-actions?/([^/]+\S)/([^/]+\S)$").expect("batch path pattern is valid")
});

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]+").expect("module cleanup pattern is valid"));

static PLURAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^aiueo](ie|e)?s$").expect("plural pattern is valid"));

/// Batch action that deletes rows.
pub const DELETE_ACTION: &str = "delete";

/// The parts of an inbound request the resolver inspects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteRequest {
    /// HTTP method.
    pub method: String,
    /// Request path, without query string.
    pub path: String,
    /// Raw body, only needed for batch actions.
    pub body: Vec<u8>,
}

impl DeleteRequest {
    /// Create a request without a body.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            body: Vec::new(),
        }
    }

    /// Attach a body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Whether this is a single-row delete.
    pub fn is_delete(&self) -> bool {
        self.method.eq_ignore_ascii_case("DELETE")
    }

    /// Whether the request could delete protected rows.
    pub fn is_candidate(&self) -> bool {
        self.is_delete() || self.batch_delete_module().is_some()
    }

    /// Module of a batch delete, when the request is one.
    pub fn batch_delete_module(&self) -> Option<&str> {
        if !self.method.eq_ignore_ascii_case("POST") {
            return None;
        }
        let (action, module) = parse_batch_path(&self.path)?;
        (action == DELETE_ACTION).then_some(module)
    }
}

/// Split a batch action path into `(action, module)`.
pub fn parse_batch_path(path: &str) -> Option<(&str, &str)> {
    let caps = BATCH_PATH.captures(path)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Parse a single-row identifier: a non-nil UUID.
pub fn parse_identifier(raw: &str) -> Result<Uuid, ResolveError> {
    match Uuid::parse_str(raw) {
        Ok(id) if !id.is_nil() => Ok(id),
        _ => Err(ResolveError::InvalidIdentifier(raw.to_string())),
    }
}

/// Parse a batch body: a JSON array of UUIDs.
pub fn parse_batch_body(body: &[u8]) -> Result<Vec<Uuid>, ResolveError> {
    serde_json::from_slice(body).map_err(|err| ResolveError::InvalidBody(err.to_string()))
}

/// Normalize a raw batch module segment into a snake-case name.
///
/// Returns `None` when nothing but separators is left.
pub fn normalize_module(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode(raw).ok()?;
    let cleaned = NON_WORD.replace_all(&decoded, "_");
    let name = cleaned.to_snake_case();

    if name.replace('_', "").is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Reduce a plural English noun to its singular form.
///
/// `countries` becomes `country`, `airports` becomes `airport`; names not
/// ending in a plural suffix are returned unchanged.
pub fn singularize(name: &str) -> String {
    if !PLURAL.is_match(name) {
        return name.to_string();
    }
    match name.strip_suffix("ies") {
        Some(stem) if name.len() > 4 => format!("{}y", stem),
        _ => name[..name.len() - 1].to_string(),
    }
}

/// Dependent tables and their foreign-key columns into one source table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependentTableMap {
    tables: BTreeMap<String, BTreeSet<String>>,
}

impl DependentTableMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the dependents of `policy.source` the policy checks.
    ///
    /// Records of other sources are skipped. A required table without any
    /// record is dropped.
    pub fn from_relations(policy: &EntityPolicy, records: &[RelationRecord]) -> Self {
        let mut map = Self::new();
        for record in records {
            if record.table_source == policy.source && policy.checks(&record.used_by_table) {
                map.insert(&record.used_by_table, &record.used_by_column);
            }
        }

        for table in &policy.required {
            if !map.contains(table) {
                debug!(source = %policy.source, table = %table, "required dependent has no relation");
            }
        }

        map
    }

    /// Add a dependent column.
    pub fn insert(&mut self, table: impl Into<String>, column: impl Into<String>) {
        self.tables
            .entry(table.into())
            .or_default()
            .insert(column.into());
    }

    /// Check whether a dependent table is present.
    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Dependent table names, sorted.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Every `(table, column)` pair, sorted.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tables.iter().flat_map(|(table, columns)| {
            columns
                .iter()
                .map(move |column| (table.as_str(), column.as_str()))
        })
    }

    /// Number of dependent tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if no dependent is left.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// A protected delete: the policy that applies and the rows it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTarget<'r> {
    /// Pattern of the matched policy.
    pub pattern: &'r str,
    /// The matched policy.
    pub policy: &'r EntityPolicy,
    /// Targeted rows.
    pub ids: Vec<Uuid>,
}

/// Resolves requests against a policy registry and the relation store.
pub struct RouteResolver<'a> {
    registry: &'a PolicyRegistry,
    store: &'a dyn RelationStore,
}

impl<'a> RouteResolver<'a> {
    /// Create a resolver.
    pub fn new(registry: &'a PolicyRegistry, store: &'a dyn RelationStore) -> Self {
        Self { registry, store }
    }

    /// Find the policy and identifiers of a request.
    ///
    /// Returns `Ok(None)` for requests that are not protected.
    pub async fn resolve(&self, request: &DeleteRequest) -> Result<Option<DeleteTarget<'a>>, Error> {
        if let Some(module) = request.batch_delete_module() {
            return self.resolve_batch(module, &request.body).await;
        }
        if !request.is_delete() {
            return Ok(None);
        }

        let Some((entry, capture)) = self.registry.match_path(&request.path) else {
            return Ok(None);
        };
        let id = parse_identifier(capture)?;

        Ok(Some(DeleteTarget {
            pattern: entry.pattern(),
            policy: entry.policy(),
            ids: vec![id],
        }))
    }

    async fn resolve_batch(
        &self,
        module: &str,
        body: &[u8],
    ) -> Result<Option<DeleteTarget<'a>>, Error> {
        let ids = parse_batch_body(body)?;
        let table = self.resolve_module(module).await?;

        let Some(entry) = self.registry.find_by_source(&table) else {
            debug!(module = %module, table = %table, "batch module has no policy");
            return Ok(None);
        };

        Ok(Some(DeleteTarget {
            pattern: entry.pattern(),
            policy: entry.policy(),
            ids,
        }))
    }

    /// Resolve a raw batch module segment to an existing table.
    ///
    /// The singular form is tried first, then the name as given.
    pub async fn resolve_module(&self, raw: &str) -> Result<String, Error> {
        let name =
            normalize_module(raw).ok_or_else(|| ResolveError::ModuleNotFound(raw.to_string()))?;
        let singular = singularize(&name);

        if self.store.table_exists(&singular).await? {
            return Ok(singular);
        }
        if singular != name && self.store.table_exists(&name).await? {
            return Ok(name);
        }

        Err(ResolveError::ModuleNotFound(singular).into())
    }

    /// Dependents of the policy's source, filtered by the policy.
    pub async fn dependents(&self, policy: &EntityPolicy) -> Result<DependentTableMap, Error> {
        let records = self.store.relations_for(&policy.source).await?;
        Ok(DependentTableMap::from_relations(policy, &records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_path() {
        assert_eq!(
            parse_batch_path("/api/v1/master/batch-actions/delete/cities"),
            Some(("delete", "cities"))
        );
        assert_eq!(
            parse_batch_path("/api/v1/master/batch-action/activate/cities"),
            Some(("activate", "cities"))
        );
        assert_eq!(parse_batch_path("/api/v1/master/cities/1"), None);
    }

    #[test]
    fn test_batch_module_requires_post() {
        let post = DeleteRequest::new("POST", "/api/v1/master/batch-actions/delete/cities");
        assert_eq!(post.batch_delete_module(), Some("cities"));

        let delete = DeleteRequest::new("DELETE", "/api/v1/master/batch-actions/delete/cities");
        assert_eq!(delete.batch_delete_module(), None);
    }

    #[test]
    fn test_parse_identifier() {
        let id = Uuid::new_v4();
        assert_eq!(parse_identifier(&id.to_string()), Ok(id));
        assert!(matches!(
            parse_identifier("42"),
            Err(ResolveError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            parse_identifier(&Uuid::nil().to_string()),
            Err(ResolveError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_parse_batch_body() {
        let id = Uuid::new_v4();
        let body = format!(r#"["{}"]"#, id);
        assert_eq!(parse_batch_body(body.as_bytes()), Ok(vec![id]));
        assert_eq!(parse_batch_body(b"[]"), Ok(vec![]));
        assert!(matches!(
            parse_batch_body(b"{\"ids\": []}"),
            Err(ResolveError::InvalidBody(_))
        ));
    }

    #[test]
    fn test_normalize_module() {
        assert_eq!(normalize_module("cities").as_deref(), Some("cities"));
        assert_eq!(normalize_module("unit-of-measures").as_deref(), Some("unit_of_measures"));
        assert_eq!(normalize_module("UnitOfMeasures").as_deref(), Some("unit_of_measures"));
        assert_eq!(normalize_module("hotel%20chains").as_deref(), Some("hotel_chains"));
        assert_eq!(normalize_module("--"), None);
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("cities"), "city");
        assert_eq!(singularize("countries"), "country");
        assert_eq!(singularize("airports"), "airport");
        assert_eq!(singularize("ties"), "tie");
        assert_eq!(singularize("status"), "status");
        assert_eq!(singularize("city"), "city");
    }

    #[test]
    fn test_dependents_required() {
        let records = vec![
            RelationRecord::new("country", "city", "country_id"),
            RelationRecord::new("country", "airport", "country_id"),
            RelationRecord::new("country", "country_translation", "country_id"),
            RelationRecord::new("city", "airport", "city_id"),
        ];

        let policy = EntityPolicy::new("country")
            .with_required(["city", "hotel"])
            .with_ignored(["city"]);
        let map = DependentTableMap::from_relations(&policy, &records);
        assert_eq!(map.tables().collect::<Vec<_>>(), vec!["city"]);

        let policy = EntityPolicy::new("country").with_ignored(["country_translation"]);
        let map = DependentTableMap::from_relations(&policy, &records);
        assert_eq!(map.tables().collect::<Vec<_>>(), vec!["airport", "city"]);
    }

    #[test]
    fn test_dependent_keeps_every_column() {
        let records = vec![
            RelationRecord::new("city", "route", "origin_city_id"),
            RelationRecord::new("city", "route", "destination_city_id"),
        ];
        let map = DependentTableMap::from_relations(&EntityPolicy::new("city"), &records);

        assert_eq!(map.len(), 1);
        assert_eq!(
            map.pairs().collect::<Vec<_>>(),
            vec![
                ("route", "destination_city_id"),
                ("route", "origin_city_id")
            ]
        );
    }
}
