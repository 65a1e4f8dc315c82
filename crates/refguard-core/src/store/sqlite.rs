//! SQLite relation store.

use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params_from_iter, types::Value, Connection, OptionalExtension};

use super::{current_timestamp, RelationRecord, RelationStore, SnapshotStatus, PUBLISH_BATCH_SIZE};
use crate::error::Error;

const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS relation_schema (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        table_source TEXT NOT NULL CHECK (length(table_source) > 0),
        column_source TEXT NOT NULL CHECK (length(column_source) > 0),
        used_by_table TEXT NOT NULL CHECK (length(used_by_table) > 0),
        used_by_column TEXT NOT NULL CHECK (length(used_by_column) > 0),
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL,
        deleted_at BIGINT
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_relation_schema_edge
        ON relation_schema (table_source, column_source, used_by_table, used_by_column)
        WHERE deleted_at IS NULL;
    CREATE INDEX IF NOT EXISTS idx_relation_schema_source ON relation_schema (table_source);
"#;

const INSERT_PREFIX: &str = "INSERT INTO relation_schema \
    (table_source, column_source, used_by_table, used_by_column, created_at, updated_at) VALUES ";

/// Multi-row insert for `rows` records, six parameters each.
fn insert_sql(rows: usize) -> String {
    let values = vec!["(?, ?, ?, ?, ?, ?)"; rows].join(", ");
    format!("{}{} ON CONFLICT DO NOTHING", INSERT_PREFIX, values)
}

const SELECT_RECORDS_SQL: &str = "SELECT table_source, column_source, used_by_table, used_by_column \
    FROM relation_schema WHERE deleted_at IS NULL";

/// Relation store over a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> Result<Self, Error> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    /// Wrap an existing connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Execute a batch of SQL statements (fixtures, application DDL).
    pub fn execute_batch(&self, sql: &str) -> Result<(), Error> {
        self.with_conn(|conn| Ok(conn.execute_batch(sql)?))
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T, Error>) -> Result<T, Error> {
        let mut conn = self.conn.lock();
        f(&mut conn)
    }

    fn has_table(conn: &Connection, table: &str) -> Result<bool, Error> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn read_records(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<RelationRecord>, Error> {
        let mut stmt = conn.prepare(sql)?;
        let records = stmt
            .query_map(params, |row| {
                Ok(RelationRecord {
                    table_source: row.get(0)?,
                    column_source: row.get(1)?,
                    used_by_table: row.get(2)?,
                    used_by_column: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

#[async_trait]
impl RelationStore for SqliteStore {
    async fn ensure_schema(&self) -> Result<(), Error> {
        self.execute_batch(SCHEMA_SQL)
    }

    async fn publish_snapshot(
        &self,
        records: &[RelationRecord],
        replace: bool,
    ) -> Result<usize, Error> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute_batch(SCHEMA_SQL)?;

            if replace {
                tx.execute("DELETE FROM relation_schema WHERE deleted_at IS NULL", [])?;
            }

            let now = current_timestamp();
            let mut inserted = 0;
            for chunk in records.chunks(PUBLISH_BATCH_SIZE) {
                let values = chunk.iter().flat_map(|record| {
                    [
                        Value::Text(record.table_source.clone()),
                        Value::Text(record.column_source.clone()),
                        Value::Text(record.used_by_table.clone()),
                        Value::Text(record.used_by_column.clone()),
                        Value::Integer(now),
                        Value::Integer(now),
                    ]
                });
                inserted += tx.execute(&insert_sql(chunk.len()), params_from_iter(values))?;
            }

            tx.commit()?;
            Ok(inserted)
        })
    }

    async fn snapshot_status(&self) -> Result<SnapshotStatus, Error> {
        self.with_conn(|conn| {
            if !Self::has_table(conn, super::RELATION_TABLE)? {
                return Ok(SnapshotStatus::default());
            }

            let (count, last_updated): (i64, Option<i64>) = conn.query_row(
                "SELECT COUNT(*), MAX(updated_at) FROM relation_schema WHERE deleted_at IS NULL",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(SnapshotStatus::from_parts(count, last_updated))
        })
    }

    async fn relations_for(&self, source_table: &str) -> Result<Vec<RelationRecord>, Error> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} AND table_source = ?1 ORDER BY used_by_table, used_by_column",
                SELECT_RECORDS_SQL
            );
            Self::read_records(conn, &sql, [source_table])
        })
    }

    async fn all_relations(&self) -> Result<Vec<RelationRecord>, Error> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} ORDER BY table_source, used_by_table, used_by_column",
                SELECT_RECORDS_SQL
            );
            Self::read_records(conn, &sql, [])
        })
    }

    async fn query_total(&self, sql: &str) -> Result<i64, Error> {
        self.with_conn(|conn| {
            let total: Option<Option<i64>> = conn
                .query_row(sql, [], |row| row.get(0))
                .optional()?;
            Ok(total.flatten().unwrap_or(0))
        })
    }

    async fn table_exists(&self, table: &str) -> Result<bool, Error> {
        self.with_conn(|conn| Self::has_table(conn, table))
    }

    async fn list_tables(&self) -> Result<Vec<String>, Error> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )?;
            let tables = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(tables)
        })
    }

    async fn table_columns(&self, table: &str) -> Result<Option<Vec<String>>, Error> {
        self.with_conn(|conn| {
            if !Self::has_table(conn, table)? {
                return Ok(None);
            }

            let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
            let columns = stmt
                .query_map([table], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(Some(columns))
        })
    }
}
