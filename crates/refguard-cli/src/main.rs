//! refguard command-line administration.
//!
//! Publishes inferred relation snapshots, validates route policies and
//! dry-runs the delete guard against a live database.

mod commands;
mod config;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "refguard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let (config, command) = Args::parse().into_config();
    tracing::debug!(
        store = ?config.store,
        config_file = %config.config_file.display(),
        "configuration loaded"
    );

    commands::run(config, command).await
}
