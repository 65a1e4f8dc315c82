//! Subcommand implementations.

use std::sync::Arc;

use anyhow::{Context, Result};
use refguard_core::{
    load_routes, validate, DeleteRequest, InferenceEngine, ProtectionFile, RelationStore,
    RouteProtection, SchemaRegistry, SqliteStore, Verdict,
};
use tracing::info;

use crate::config::{CliConfig, Command, RouteArgs, StoreTarget};

/// Open the configured relation store.
pub async fn open_store(target: &StoreTarget) -> Result<Arc<dyn RelationStore>> {
    match target {
        StoreTarget::Sqlite(path) => {
            let store = SqliteStore::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "postgres")]
        StoreTarget::Postgres(url) => {
            let store = refguard_core::PostgresStore::connect(url)
                .await
                .context("failed to connect to postgres")?;
            Ok(Arc::new(store))
        }
    }
}

/// Run one subcommand.
pub async fn run(config: CliConfig, command: Command) -> Result<()> {
    let store = open_store(&config.store).await?;

    if let Command::Status = command {
        return status(store.as_ref()).await;
    }

    let file = ProtectionFile::load(&config.config_file)
        .with_context(|| format!("failed to load {}", config.config_file.display()))?;
    let schema = SchemaRegistry::reflect(store.as_ref(), file.tables.as_deref()).await?;
    info!(tables = schema.len(), "reflected schema");

    match command {
        Command::Migrate { replace, dry_run } => {
            migrate(store, &file, &schema, replace, dry_run).await
        }
        Command::Validate { routes } => {
            let routes = load_routes(&routes.routes, prefix(&routes, &file))?;
            let registry = file.policy_registry()?;
            validate::validate(&registry, &schema, &routes)?;
            println!(
                "{} policies match {} delete routes",
                registry.len(),
                routes.len()
            );
            Ok(())
        }
        Command::Check {
            routes,
            method,
            path,
            body,
        } => {
            let routes = load_routes(&routes.routes, prefix(&routes, &file))?;
            let protection = RouteProtection::new(store).await?;
            protection.map_routes(file.policy_registry()?, &schema, &routes)?;

            let request = DeleteRequest::new(method, path)
                .with_body(body.map(String::into_bytes).unwrap_or_default());
            match protection.protect(&request).await? {
                Verdict::Allowed => println!("allowed"),
                Verdict::Blocked { total } => {
                    println!("blocked: {} live rows reference the target", total)
                }
            }
            Ok(())
        }
        Command::Status => Ok(()),
    }
}

fn prefix<'a>(args: &'a RouteArgs, file: &'a ProtectionFile) -> &'a str {
    args.prefix.as_deref().unwrap_or(&file.route_prefix)
}

async fn migrate(
    store: Arc<dyn RelationStore>,
    file: &ProtectionFile,
    schema: &SchemaRegistry,
    replace: bool,
    dry_run: bool,
) -> Result<()> {
    if dry_run {
        let records = InferenceEngine::new(schema, &file.rules).infer()?;
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let protection = RouteProtection::new(store).await?;
    let outcome = protection
        .migrate_relations(schema, &file.rules, replace)
        .await?;
    println!(
        "inferred {} relations, inserted {}",
        outcome.records.len(),
        outcome.inserted
    );
    Ok(())
}

async fn status(store: &dyn RelationStore) -> Result<()> {
    let status = store.snapshot_status().await?;
    match status.last_updated {
        Some(updated) if status.present => println!("migrated, last updated {}", updated),
        _ if status.present => println!("migrated"),
        _ => println!("not migrated"),
    }
    Ok(())
}
