//! Compiled route policy registry.

use regex::{Regex, RegexSet};
use tracing::{debug, warn};

use super::EntityPolicy;
use crate::error::{Error, Report};

/// A route pattern with its compiled regex and policy.
#[derive(Debug, Clone)]
pub struct PolicyEntry {
    pattern: String,
    regex: Regex,
    policy: EntityPolicy,
}

impl PolicyEntry {
    /// The declared pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The compiled pattern.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// The entity policy.
    pub fn policy(&self) -> &EntityPolicy {
        &self.policy
    }
}

/// Ordered set of route policies, immutable once built.
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    entries: Vec<PolicyEntry>,
    set: RegexSet,
}

impl PolicyRegistry {
    /// Start declaring policies.
    pub fn builder() -> PolicyRegistryBuilder {
        PolicyRegistryBuilder::default()
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[PolicyEntry] {
        &self.entries
    }

    /// Number of policies.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no policy is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry (in declaration order) matching `path`, with the value of
    /// its capture group.
    pub fn match_path<'p>(&self, path: &'p str) -> Option<(&PolicyEntry, &'p str)> {
        let idx = self.set.matches(path).into_iter().next()?;
        let entry = &self.entries[idx];
        let capture = entry
            .regex
            .captures(path)
            .and_then(|caps| caps.get(1))
            .map_or("", |m| m.as_str());
        Some((entry, capture))
    }

    /// First entry whose policy source is `table`.
    pub fn find_by_source(&self, table: &str) -> Option<&PolicyEntry> {
        self.entries.iter().find(|e| e.policy.source == table)
    }
}

/// Collects policies before compiling them into a [`PolicyRegistry`].
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistryBuilder {
    declared: Vec<(String, EntityPolicy)>,
}

impl PolicyRegistryBuilder {
    /// Declare a policy for `pattern`.
    ///
    /// Registration is merge-only: a pattern already declared keeps its
    /// first policy.
    pub fn register(mut self, pattern: impl Into<String>, policy: EntityPolicy) -> Self {
        let pattern = pattern.into();
        if let Some((_, existing)) = self.declared.iter().find(|(p, _)| *p == pattern) {
            warn!(
                pattern = %pattern,
                source = %existing.source,
                ignored_source = %policy.source,
                "route policy already registered"
            );
            return self;
        }
        self.declared.push((pattern, policy));
        self
    }

    /// Declare several policies in order.
    pub fn register_all<I, P>(self, policies: I) -> Self
    where
        I: IntoIterator<Item = (P, EntityPolicy)>,
        P: Into<String>,
    {
        policies
            .into_iter()
            .fold(self, |builder, (pattern, policy)| builder.register(pattern, policy))
    }

    /// Compile every pattern.
    ///
    /// Every pattern must compile and capture exactly one group, and neither
    /// a pattern nor a source may be empty. All problems are reported in one
    /// [`Error::Config`].
    pub fn build(self) -> Result<PolicyRegistry, Error> {
        let mut report = Report::new("build route policies");
        let mut entries = Vec::with_capacity(self.declared.len());

        for (idx, (pattern, policy)) in self.declared.into_iter().enumerate() {
            if pattern.trim().is_empty() {
                report.push(format!("pattern at index {} is empty", idx));
                continue;
            }
            if policy.source.trim().is_empty() {
                report.push(format!("pattern {}: source is empty", pattern));
                continue;
            }

            let regex = match Regex::new(&pattern) {
                Ok(regex) => regex,
                Err(err) => {
                    report.push(format!("pattern {}: {}", pattern, err));
                    continue;
                }
            };
            let groups = regex.captures_len() - 1;
            if groups != 1 {
                report.push(format!(
                    "pattern {} must capture exactly one group, found {}",
                    pattern, groups
                ));
                continue;
            }

            entries.push(PolicyEntry {
                pattern,
                regex,
                policy,
            });
        }

        report.into_config_result()?;

        let set = RegexSet::new(entries.iter().map(|e| e.pattern.as_str())).map_err(|err| {
            let mut report = Report::new("build route policies");
            report.push(err.to_string());
            Error::Config(report)
        })?;

        debug!(policies = entries.len(), "built route policy registry");
        Ok(PolicyRegistry { entries, set })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ServicePrefix;

    #[test]
    fn test_first_match_wins() {
        let registry = PolicyRegistry::builder()
            .register(".*/cities?/([^/]+)$", EntityPolicy::new("city"))
            .register(".*/([^/]+)$", EntityPolicy::new("anything"))
            .build()
            .unwrap();

        let (entry, id) = registry.match_path("/api/v1/master/cities/abc").unwrap();
        assert_eq!(entry.policy().source, "city");
        assert_eq!(id, "abc");

        let (entry, _) = registry.match_path("/api/v1/master/airports/abc").unwrap();
        assert_eq!(entry.policy().source, "anything");
    }

    #[test]
    fn test_register_is_merge_only() {
        let pattern = ServicePrefix::Master.pattern("cities");
        let registry = PolicyRegistry::builder()
            .register(pattern.clone(), EntityPolicy::new("city"))
            .register(pattern, EntityPolicy::new("town"))
            .build()
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.entries()[0].policy().source, "city");
    }

    #[test]
    fn test_build_aggregates_problems() {
        let err = PolicyRegistry::builder()
            .register("", EntityPolicy::new("city"))
            .register(".*/countries?/([^/]+)$", EntityPolicy::new(""))
            .register(".*/airports?/([^/]+$", EntityPolicy::new("airport"))
            .register(".*/(hotel)s?/([^/]+)$", EntityPolicy::new("hotel"))
            .register(".*/regions?/[^/]+$", EntityPolicy::new("region"))
            .build()
            .unwrap_err();

        match err {
            Error::Config(report) => {
                assert_eq!(report.messages.len(), 5);
                assert!(report.messages[0].contains("index 0 is empty"));
                assert!(report.messages[1].contains("source is empty"));
                assert!(report.messages[3].contains("found 2"));
                assert!(report.messages[4].contains("found 0"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_find_by_source() {
        let registry = PolicyRegistry::builder()
            .register_all([
                (ServicePrefix::Master.pattern("cities"), EntityPolicy::new("city")),
                (
                    ServicePrefix::Master.pattern("countries"),
                    EntityPolicy::new("country"),
                ),
            ])
            .build()
            .unwrap();

        assert!(registry.find_by_source("country").is_some());
        assert!(registry.find_by_source("airport").is_none());
        assert!(registry.match_path("/api/v1/master/airports/1").is_none());
    }
}
