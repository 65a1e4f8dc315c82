//! Command-line arguments and the configuration derived from them.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default SQLite database path.
pub const DEFAULT_DATABASE: &str = "./refguard.db";

/// Default protection file path.
pub const DEFAULT_CONFIG_FILE: &str = "./refguard.json";

/// Where the relation store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    /// SQLite database file.
    Sqlite(PathBuf),
    /// PostgreSQL connection URL.
    #[cfg(feature = "postgres")]
    Postgres(String),
}

/// Resolved CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Relation store to open.
    pub store: StoreTarget,
    /// Protection file with exclusion rules and policies.
    pub config_file: PathBuf,
}

impl CliConfig {
    /// Create a configuration backed by a SQLite file.
    pub fn new(database: impl Into<PathBuf>) -> Self {
        Self {
            store: StoreTarget::Sqlite(database.into()),
            config_file: PathBuf::from(DEFAULT_CONFIG_FILE),
        }
    }

    /// Set the protection file.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = path.into();
        self
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE)
    }
}

/// refguard administration.
#[derive(Parser, Debug)]
#[command(name = "refguard")]
#[command(version, about = "Infer table relations and guard deletes", long_about = None)]
pub struct Args {
    /// Path to the SQLite database.
    #[arg(short, long, default_value = DEFAULT_DATABASE)]
    pub database: PathBuf,

    /// PostgreSQL connection URL; takes precedence over --database.
    #[cfg(feature = "postgres")]
    #[arg(long)]
    pub postgres_url: Option<String>,

    /// Path to the protection file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Route file options shared by the commands that map routes.
#[derive(clap::Args, Debug, Clone)]
pub struct RouteArgs {
    /// Route declaration file (.go, .rs, .txt or .json).
    #[arg(short, long)]
    pub routes: PathBuf,

    /// Prefix prepended to every route; defaults to the protection file's.
    #[arg(short, long)]
    pub prefix: Option<String>,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Infer relations from the live schema and publish them.
    Migrate {
        /// Remove the previous snapshot before publishing.
        #[arg(long)]
        replace: bool,

        /// Print the inferred relations without publishing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Check route policies against the route file and the schema.
    Validate {
        #[command(flatten)]
        routes: RouteArgs,
    },

    /// Show whether a relation snapshot is present.
    Status,

    /// Decide whether a request would be allowed.
    Check {
        #[command(flatten)]
        routes: RouteArgs,

        /// HTTP method of the request.
        method: String,

        /// Request path.
        path: String,

        /// Request body, for batch deletes.
        #[arg(short, long)]
        body: Option<String>,
    },
}

impl Args {
    /// Convert command-line arguments to the CLI configuration.
    pub fn into_config(self) -> (CliConfig, Command) {
        #[cfg(feature = "postgres")]
        let store = match self.postgres_url {
            Some(url) => StoreTarget::Postgres(url),
            None => StoreTarget::Sqlite(self.database),
        };
        #[cfg(not(feature = "postgres"))]
        let store = StoreTarget::Sqlite(self.database);

        let config = CliConfig {
            store,
            config_file: self.config,
        };
        (config, self.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.store, StoreTarget::Sqlite(PathBuf::from(DEFAULT_DATABASE)));
        assert_eq!(config.config_file, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn test_parse_migrate() {
        let args = Args::parse_from([
            "refguard",
            "--database",
            "/tmp/master.db",
            "--config",
            "/etc/refguard.json",
            "migrate",
            "--replace",
        ]);
        let (config, command) = args.into_config();

        assert_eq!(
            config,
            CliConfig::new("/tmp/master.db").with_config_file("/etc/refguard.json")
        );
        assert!(matches!(
            command,
            Command::Migrate {
                replace: true,
                dry_run: false
            }
        ));
    }

    #[test]
    fn test_parse_check() {
        let args = Args::parse_from([
            "refguard",
            "check",
            "--routes",
            "routes.json",
            "--body",
            "[]",
            "POST",
            "/api/v1/master/batch-actions/delete/cities",
        ]);
        let (_, command) = args.into_config();

        let Command::Check {
            routes,
            method,
            path,
            body,
        } = command
        else {
            panic!("expected check command");
        };
        assert_eq!(routes.routes, PathBuf::from("routes.json"));
        assert!(routes.prefix.is_none());
        assert_eq!(method, "POST");
        assert_eq!(path, "/api/v1/master/batch-actions/delete/cities");
        assert_eq!(body.as_deref(), Some("[]"));
    }
}
