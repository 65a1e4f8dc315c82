//! PostgreSQL relation store.
//!
//! Enable with `--features postgres`.

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};

use super::{current_timestamp, RelationRecord, RelationStore, SnapshotStatus, PUBLISH_BATCH_SIZE};
use crate::error::Error;

const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS relation_schema (
        id BIGSERIAL PRIMARY KEY,
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

const SELECT_RECORDS_SQL: &str = "SELECT table_source, column_source, used_by_table, used_by_column \
    FROM relation_schema WHERE deleted_at IS NULL";

type RecordRow = (String, String, String, String);

fn into_record((table_source, column_source, used_by_table, used_by_column): RecordRow) -> RelationRecord {
    RelationRecord {
        table_source,
        column_source,
        used_by_table,
        used_by_column,
    }
}

/// Relation store over a PostgreSQL connection pool.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to the database at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RelationStore for PostgresStore {
    async fn ensure_schema(&self) -> Result<(), Error> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn publish_snapshot(
        &self,
        records: &[RelationRecord],
        replace: bool,
    ) -> Result<usize, Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::raw_sql(SCHEMA_SQL).execute(&mut *tx).await?;

        if replace {
            sqlx::query("DELETE FROM relation_schema WHERE deleted_at IS NULL")
                .execute(&mut *tx)
                .await?;
        }

        let now = current_timestamp();
        let mut inserted = 0;
        for chunk in records.chunks(PUBLISH_BATCH_SIZE) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO relation_schema \
                 (table_source, column_source, used_by_table, used_by_column, created_at, updated_at) ",
            );
            builder.push_values(chunk, |mut row, record| {
                row.push_bind(record.table_source.clone())
                    .push_bind(record.column_source.clone())
                    .push_bind(record.used_by_table.clone())
                    .push_bind(record.used_by_column.clone())
                    .push_bind(now)
                    .push_bind(now);
            });
            builder.push(" ON CONFLICT DO NOTHING");

            let result = builder.build().execute(&mut *tx).await?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn snapshot_status(&self) -> Result<SnapshotStatus, Error> {
        if !self.table_exists(super::RELATION_TABLE).await? {
            return Ok(SnapshotStatus::default());
        }

        let (count, last_updated): (i64, Option<i64>) = sqlx::query_as(
            "SELECT COUNT(*), MAX(updated_at) FROM relation_schema WHERE deleted_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(SnapshotStatus::from_parts(count, last_updated))
    }

    async fn relations_for(&self, source_table: &str) -> Result<Vec<RelationRecord>, Error> {
        let sql = format!(
            "{} AND table_source = $1 ORDER BY used_by_table, used_by_column",
            SELECT_RECORDS_SQL
        );
        let rows: Vec<RecordRow> = sqlx::query_as(&sql)
            .bind(source_table)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(into_record).collect())
    }

    async fn all_relations(&self) -> Result<Vec<RelationRecord>, Error> {
        let sql = format!(
            "{} ORDER BY table_source, used_by_table, used_by_column",
            SELECT_RECORDS_SQL
        );
        let rows: Vec<RecordRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(into_record).collect())
    }

    async fn query_total(&self, sql: &str) -> Result<i64, Error> {
        let total: Option<Option<i64>> = sqlx::query_scalar(sql)
            .fetch_optional(&self.pool)
            .await?;
        Ok(total.flatten().unwrap_or(0))
    }

    async fn table_exists(&self, table: &str) -> Result<bool, Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1)",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list_tables(&self) -> Result<Vec<String>, Error> {
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }

    async fn table_columns(&self, table: &str) -> Result<Option<Vec<String>>, Error> {
        if !self.table_exists(table).await? {
            return Ok(None);
        }

        let columns: Vec<String> = sqlx::query_scalar(
            "SELECT column_name::text FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 \
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;
        Ok(Some(columns))
    }
}
