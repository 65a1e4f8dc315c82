//! Protection file: exclusion rules and route policies declared as JSON.
//!
//! ```json
//! {
//!   "route_prefix": "/api/v1/master",
//!   "rules": {
//!     "overrides": { "destination_airport_id": "airport" },
//!     "unknown": ["agency_id"],
//!     "cache_prefixes": ["relation_schema", "flight_caching"]
//!   },
//!   "policies": [
//!     { "service": "master", "module": "cities", "source": "city" },
//!     { "pattern": ".*/countries?/([^/]+)$", "source": "country", "required": ["city"] }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::inference::ExclusionRules;
use crate::policy::{EntityPolicy, PolicyRegistry, ServicePrefix};

/// How a policy names its route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolicyRoute {
    /// Explicit regex pattern.
    Pattern { pattern: String },
    /// Plural module under a service prefix.
    Module {
        service: ServicePrefix,
        module: String,
    },
}

impl PolicyRoute {
    /// The route pattern.
    pub fn pattern(&self) -> String {
        match self {
            PolicyRoute::Pattern { pattern } => pattern.clone(),
            PolicyRoute::Module { service, module } => service.pattern(module),
        }
    }
}

/// One declared policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecl {
    #[serde(flatten)]
    pub route: PolicyRoute,
    #[serde(flatten)]
    pub policy: EntityPolicy,
}

/// Contents of a protection file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionFile {
    /// Prefix prepended to every route read from the route file.
    pub route_prefix: String,
    /// Tables to reflect; all tables when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<String>>,
    /// Inference exclusion rules.
    pub rules: ExclusionRules,
    /// Route policies, in match order.
    pub policies: Vec<PolicyDecl>,
}

impl ProtectionFile {
    /// Parse a protection file from JSON text.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a protection file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Compile the declared policies.
    pub fn policy_registry(&self) -> Result<PolicyRegistry, Error> {
        PolicyRegistry::builder()
            .register_all(
                self.policies
                    .iter()
                    .map(|decl| (decl.route.pattern(), decl.policy.clone())),
            )
            .build()
    }
}
