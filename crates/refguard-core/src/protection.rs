//! Route protection: relation migration, route mapping and request checks
//! behind one handle.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::catalog::SchemaRegistry;
use crate::error::Error;
use crate::guard::{DeleteGuard, Verdict};
use crate::inference::{self, ExclusionRules, MigrationOutcome};
use crate::policy::PolicyRegistry;
use crate::resolver::{DeleteRequest, RouteResolver};
use crate::store::{RelationStore, SnapshotStatus};
use crate::validate::{self, MappingRoute};

/// Shared delete protection for one database.
pub struct RouteProtection {
    store: Arc<dyn RelationStore>,
    status: RwLock<SnapshotStatus>,
    registry: RwLock<Option<Arc<PolicyRegistry>>>,
}

impl RouteProtection {
    /// Create a protection over `store`, reading the snapshot status once.
    pub async fn new(store: Arc<dyn RelationStore>) -> Result<Self, Error> {
        let status = store.snapshot_status().await?;
        debug!(present = status.present, last_updated = ?status.last_updated, "relation snapshot status");

        Ok(Self {
            store,
            status: RwLock::new(status),
            registry: RwLock::new(None),
        })
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn RelationStore> {
        &self.store
    }

    /// Last known snapshot status.
    pub fn status(&self) -> SnapshotStatus {
        *self.status.read()
    }

    /// Re-read the snapshot status from the store.
    pub async fn refresh_status(&self) -> Result<SnapshotStatus, Error> {
        let status = self.store.snapshot_status().await?;
        *self.status.write() = status;
        Ok(status)
    }

    /// Infer relations from `schema` and publish them.
    pub async fn migrate_relations(
        &self,
        schema: &SchemaRegistry,
        rules: &ExclusionRules,
        replace: bool,
    ) -> Result<MigrationOutcome, Error> {
        let outcome =
            inference::migrate_relations(self.store.as_ref(), schema, rules, replace).await?;
        self.refresh_status().await?;
        Ok(outcome)
    }

    /// Validate `registry` against the declared routes and the schema, then
    /// install it.
    ///
    /// A registry that fails validation is not installed.
    pub fn map_routes(
        &self,
        registry: PolicyRegistry,
        schema: &SchemaRegistry,
        routes: &[MappingRoute],
    ) -> Result<(), Error> {
        validate::validate(&registry, schema, routes)?;

        info!(policies = registry.len(), routes = routes.len(), "mapped route policies");
        *self.registry.write() = Some(Arc::new(registry));
        Ok(())
    }

    /// The installed policy registry.
    pub fn registry(&self) -> Option<Arc<PolicyRegistry>> {
        self.registry.read().clone()
    }

    /// Whether a policy registry is installed.
    pub fn is_mapped(&self) -> bool {
        self.registry.read().is_some()
    }

    /// Decide whether `request` may proceed.
    pub async fn protect(&self, request: &DeleteRequest) -> Result<Verdict, Error> {
        let mut status = self.status();
        if !status.present {
            status = self.refresh_status().await?;
        }
        if !status.present {
            return Err(Error::NotMigrated);
        }
        debug!(last_updated = ?status.last_updated, "latest relation migration");

        let registry = self.registry().ok_or(Error::NotMapped)?;
        let resolver = RouteResolver::new(&registry, self.store.as_ref());

        let Some(target) = resolver.resolve(request).await? else {
            return Ok(Verdict::Allowed);
        };
        if target.ids.is_empty() {
            return Ok(Verdict::Allowed);
        }

        let dependents = resolver.dependents(target.policy).await?;
        let verdict = DeleteGuard::new(self.store.as_ref())
            .check(&dependents, &target.ids)
            .await?;

        if let Verdict::Blocked { total } = verdict {
            info!(
                source = %target.policy.source,
                pattern = %target.pattern,
                ids = target.ids.len(),
                total = total,
                "blocked delete of referenced rows"
            );
        }

        Ok(verdict)
    }
}
