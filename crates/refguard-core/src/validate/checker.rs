//! Consistency of declared policies against real routes and tables.

use std::collections::{btree_map::Entry, BTreeMap};

use tracing::debug;

use super::MappingRoute;
use crate::catalog::SchemaRegistry;
use crate::error::{Error, Report};
use crate::policy::PolicyRegistry;

/// Check that every pattern matches exactly one `DELETE` route and every
/// route is matched by at most one pattern.
pub fn validate_routes(registry: &PolicyRegistry, routes: &[MappingRoute]) -> Report {
    let mut report = Report::new("validate routes");
    let mut route_patterns: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for entry in registry.entries() {
        let matched: Vec<&str> = routes
            .iter()
            .filter(|route| route.is_delete() && entry.regex().is_match(&route.path))
            .map(|route| route.path.as_str())
            .collect();

        debug!(pattern = %entry.pattern(), routes = ?matched, "pattern routes");

        match matched.len() {
            0 => report.push(format!("pattern {} is not match any route", entry.pattern())),
            1 => {}
            _ => report.push(format!(
                "pattern {} match more than one route: {}",
                entry.pattern(),
                matched.join(", ")
            )),
        }

        for path in matched {
            let patterns = route_patterns.entry(path).or_default();
            if !patterns.contains(&entry.pattern()) {
                patterns.push(entry.pattern());
            }
        }
    }

    for (path, patterns) in route_patterns {
        if patterns.len() > 1 {
            report.push(format!(
                "route {} match more than one pattern: {}",
                path,
                patterns.join(", ")
            ));
        }
    }

    report
}

/// Check that every source, required and ignored table is registered, and
/// that no two policies share a source.
///
/// Ignored tables are only checked when the policy has no required tables.
/// Batch deletes look policies up by source, so a shared source is rejected.
pub fn validate_tables(registry: &PolicyRegistry, schema: &SchemaRegistry) -> Report {
    let mut report = Report::new("validate tables");

    if schema.is_empty() {
        report.push("schema registry is empty");
        return report;
    }

    let mut sources: BTreeMap<&str, &str> = BTreeMap::new();
    for entry in registry.entries() {
        let policy = entry.policy();
        match sources.entry(policy.source.as_str()) {
            Entry::Occupied(first) => report.push(format!(
                "source {} on pattern {} is already declared on pattern {}",
                policy.source,
                entry.pattern(),
                first.get()
            )),
            Entry::Vacant(slot) => {
                slot.insert(entry.pattern());
            }
        }
        if !schema.contains(&policy.source) {
            report.push(format!(
                "source {} on pattern {} is not a registered table",
                policy.source,
                entry.pattern()
            ));
        }

        let (category, tables) = if policy.is_exhaustive() {
            ("required", &policy.required)
        } else {
            ("ignored", &policy.ignored)
        };
        for (idx, table) in tables.iter().enumerate() {
            if !schema.contains(table) {
                report.push(format!(
                    "{} relation {} index {} on pattern {} is not a registered table",
                    category,
                    table,
                    idx,
                    entry.pattern()
                ));
            }
        }
    }

    report
}

/// Run both checks and report every problem in one [`Error::Config`].
pub fn validate(
    registry: &PolicyRegistry,
    schema: &SchemaRegistry,
    routes: &[MappingRoute],
) -> Result<(), Error> {
    let mut report = Report::new("map routes");
    report.extend(validate_routes(registry, routes));
    report.extend(validate_tables(registry, schema));
    report.into_config_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableDef;
    use crate::policy::{EntityPolicy, ServicePrefix};

    fn schema() -> SchemaRegistry {
        SchemaRegistry::from_tables([
            TableDef::new("country").with_columns(["id"]),
            TableDef::new("city").with_columns(["id", "country_id"]),
            TableDef::new("airport").with_columns(["id", "city_id"]),
        ])
        .unwrap()
    }

    fn routes() -> Vec<MappingRoute> {
        vec![
            MappingRoute::new("DELETE", "/api/v1/master/cities/:id"),
            MappingRoute::new("DELETE", "/api/v1/master/countries/:id"),
            MappingRoute::new("GET", "/api/v1/master/airports/:id"),
        ]
    }

    #[test]
    fn test_valid_mapping() {
        let registry = PolicyRegistry::builder()
            .register(ServicePrefix::Master.pattern("cities"), EntityPolicy::new("city"))
            .register(
                ServicePrefix::Master.pattern("countries"),
                EntityPolicy::new("country").with_required(["city"]),
            )
            .build()
            .unwrap();

        assert!(validate(&registry, &schema(), &routes()).is_ok());
    }

    #[test]
    fn test_route_cardinality() {
        let registry = PolicyRegistry::builder()
            .register(ServicePrefix::Master.pattern("cities"), EntityPolicy::new("city"))
            .register(".*/master/([^/]+)/:id$", EntityPolicy::new("country"))
            .register(ServicePrefix::Master.pattern("airports"), EntityPolicy::new("airport"))
            .build()
            .unwrap();

        let report = validate_routes(&registry, &routes());
        assert_eq!(report.messages.len(), 3);
        assert!(report.messages[0].contains("match more than one route"));
        assert!(report.messages[1].contains("airports?/([^/]+)$ is not match any route"));
        assert!(report.messages[2].starts_with("route /api/v1/master/cities/:id match more than one pattern"));
    }

    #[test]
    fn test_unknown_tables() {
        let registry = PolicyRegistry::builder()
            .register(
                ServicePrefix::Master.pattern("cities"),
                EntityPolicy::new("town").with_ignored(["harbor"]),
            )
            .register(
                ServicePrefix::Master.pattern("countries"),
                EntityPolicy::new("country")
                    .with_required(["city", "province"])
                    .with_ignored(["ignored_but_unchecked"]),
            )
            .build()
            .unwrap();

        let report = validate_tables(&registry, &schema());
        assert_eq!(
            report.messages,
            vec![
                "source town on pattern .*/api/v1/master/cities?/([^/]+)$ is not a registered table",
                "ignored relation harbor index 0 on pattern .*/api/v1/master/cities?/([^/]+)$ is not a registered table",
                "required relation province index 1 on pattern .*/api/v1/master/countries?/([^/]+)$ is not a registered table",
            ]
        );
    }

    #[test]
    fn test_shared_source_rejected() {
        let registry = PolicyRegistry::builder()
            .register(ServicePrefix::Master.pattern("cities"), EntityPolicy::new("city"))
            .register(
                ServicePrefix::Integration.pattern("cities"),
                EntityPolicy::new("city").with_ignored(["airport"]),
            )
            .build()
            .unwrap();

        let report = validate_tables(&registry, &schema());
        assert_eq!(
            report.messages,
            vec![
                "source city on pattern .*/api/v1/integration/cities?/([^/]+)$ is already declared on pattern .*/api/v1/master/cities?/([^/]+)$",
            ]
        );
    }

    #[test]
    fn test_both_steps_aggregated() {
        let registry = PolicyRegistry::builder()
            .register(ServicePrefix::Master.pattern("hotels"), EntityPolicy::new("hotel"))
            .build()
            .unwrap();

        match validate(&registry, &schema(), &routes()) {
            Err(Error::Config(report)) => {
                assert_eq!(report.messages.len(), 2);
                assert!(report.messages[0].contains("is not match any route"));
                assert!(report.messages[1].contains("source hotel"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
