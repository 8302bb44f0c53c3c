use anyhow::{Context, Result};
use sqlx::{Sqlite, SqlitePool};
use sqlx::sqlite::SqlitePoolOptions;

use super::{Store, insert, report_write, schema};
use crate::model::{Observation, Station, Table};

/// SQLite-backed store, for local runs and tests.
///
/// The pool keeps exactly one connection alive forever so that
/// `sqlite::memory:` databases survive between calls.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// In-memory database with the schema already created.
    pub async fn in_memory() -> Result<Self> {
        let store = Self::connect("sqlite::memory:").await?;
        store.ensure_schema().await?;
        Ok(store)
    }
}

#[async_trait::async_trait]
impl Store for SqliteStore {
    #[tracing::instrument(skip_all, fields(rows = rows.len()))]
    async fn insert_stations(&self, rows: &[Station]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in rows.chunks(insert::BATCH_ROWS) {
            let mut qb = insert::stations::<Sqlite>(chunk);
            inserted += qb
                .build()
                .execute(&mut *tx)
                .await
                .context("insert stations")?
                .rows_affected();
        }

        tx.commit().await?;
        report_write(Table::Station, rows.len(), inserted);
        Ok(inserted)
    }

    #[tracing::instrument(skip_all, fields(rows = rows.len()))]
    async fn insert_observations(&self, rows: &[Observation]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in rows.chunks(insert::BATCH_ROWS) {
            let mut qb = insert::observations::<Sqlite>(chunk);
            inserted += qb
                .build()
                .execute(&mut *tx)
                .await
                .context("insert observations")?
                .rows_affected();
        }

        tx.commit().await?;
        report_write(Table::Historic, rows.len(), inserted);
        Ok(inserted)
    }

    async fn stations(&self) -> Result<Vec<Station>> {
        let rows = sqlx::query_as::<_, Station>("SELECT * FROM station ORDER BY stationcode")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn history(&self, stationcode: &str) -> Result<Vec<Observation>> {
        let rows = sqlx::query_as::<_, Observation>(
            "SELECT * FROM historic WHERE stationcode = ? ORDER BY duedate, record_id",
        )
        .bind(stationcode)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count(&self, table: Table) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        let n = sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(schema::SQLITE).execute(&self.pool).await?;
        Ok(())
    }
}
