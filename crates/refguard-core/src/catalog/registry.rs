//! Registry of table descriptors.

use std::collections::BTreeMap;

use tracing::debug;

use super::{Requirement, TableDef};
use crate::error::{Error, Report};
use crate::store::RelationStore;

/// The set of row models registered with the application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaRegistry {
    tables: BTreeMap<String, TableDef>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, reporting every invalid descriptor at once.
    pub fn from_tables(tables: impl IntoIterator<Item = TableDef>) -> Result<Self, Error> {
        let mut registry = Self::new();
        let mut report = Report::new("register tables");

        for (idx, table) in tables.into_iter().enumerate() {
            if let Err(message) = registry.try_register(table) {
                report.push(format!("index {}: {}", idx, message));
            }
        }

        report.into_config_result()?;
        Ok(registry)
    }

    /// Register a table.
    ///
    /// Registering an identical descriptor twice is a no-op.
    pub fn register(&mut self, table: TableDef) -> Result<(), Error> {
        self.try_register(table).map_err(|message| {
            let mut report = Report::new("register tables");
            report.push(message);
            Error::Config(report)
        })
    }

    fn try_register(&mut self, table: TableDef) -> Result<(), String> {
        if table.name.trim().is_empty() {
            return Err("table name is empty".to_string());
        }
        if table.columns.is_empty() {
            return Err(format!("columns of table {} are empty", table.name));
        }
        if let Some(existing) = self.tables.get(&table.name) {
            if existing != &table {
                return Err(format!(
                    "table {} is already registered with different columns",
                    table.name
                ));
            }
            return Ok(());
        }

        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    /// Add a table, builder style.
    pub fn with_table(mut self, table: TableDef) -> Result<Self, Error> {
        self.register(table)?;
        Ok(self)
    }

    /// Get a table by name.
    pub fn get(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    /// Check whether a table is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Registered table names, sorted.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|s| s.as_str())
    }

    /// Registered tables, sorted by name.
    pub fn tables(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.values()
    }

    /// Number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Foreign-key candidate columns and the tables that own them.
    pub fn candidate_columns(&self, requirement: &Requirement) -> BTreeMap<String, Vec<String>> {
        let mut columns: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for table in self.tables.values() {
            for column in table.column_names() {
                if requirement.is_candidate(column) {
                    columns
                        .entry(column.to_string())
                        .or_default()
                        .push(table.name.clone());
                }
            }
        }

        columns
    }

    /// Build a registry from a live database.
    ///
    /// With `tables` unset every user table of the database is reflected.
    /// Empty tables reflect fine; a missing table is
    /// [`Error::TableNotRegistered`].
    pub async fn reflect(
        store: &dyn RelationStore,
        tables: Option<&[String]>,
    ) -> Result<Self, Error> {
        let names = match tables {
            Some(names) => names.to_vec(),
            None => store.list_tables().await?,
        };

        let mut registry = Self::new();
        for name in names {
            let columns = store
                .table_columns(&name)
                .await?
                .ok_or_else(|| Error::TableNotRegistered(name.clone()))?;
            debug!(table = %name, columns = columns.len(), "reflected table");
            registry.register(TableDef::new(name).with_columns(columns))?;
        }

        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SchemaRegistry {
        SchemaRegistry::from_tables([
            TableDef::new("country").with_columns(["id", "name"]),
            TableDef::new("city").with_columns(["id", "name", "country_id"]),
            TableDef::new("airport").with_columns(["id", "city_id", "country_id"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_candidate_columns() {
        let registry = sample();
        let columns = registry.candidate_columns(&Requirement::default());

        assert_eq!(columns.len(), 2);
        assert_eq!(columns["country_id"], vec!["airport", "city"]);
        assert_eq!(columns["city_id"], vec!["airport"]);
    }

    #[test]
    fn test_invalid_tables_are_aggregated() {
        let err = SchemaRegistry::from_tables([
            TableDef::new(""),
            TableDef::new("city"),
            TableDef::new("country").with_column("id"),
        ])
        .unwrap_err();

        match err {
            Error::Config(report) => {
                assert_eq!(report.messages.len(), 2);
                assert!(report.messages[0].contains("table name is empty"));
                assert!(report.messages[1].contains("columns of table city are empty"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = sample();

        assert!(registry
            .register(TableDef::new("country").with_columns(["id", "name"]))
            .is_ok());
        assert!(registry
            .register(TableDef::new("country").with_columns(["id"]))
            .is_err());
        assert_eq!(registry.len(), 3);
    }
}
