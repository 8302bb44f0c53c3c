//! Persistence of station and observation rows.
//!
//! [`Store`] is the async trait the pipeline writes through.
//! [`PgStore`] implements it on PostgreSQL, [`SqliteStore`] on SQLite.
//!
//! Writes are idempotent: every row is inserted with a conflict-ignoring
//! insert keyed on the table's primary key, and all rows of one call commit
//! in a single transaction. Rows whose key already exists are skipped, so
//! station rows are insert-once and never refreshed.

mod insert;
mod postgres;
pub mod schema;
mod sqlite;

pub use postgres::PgStore;
pub use sqlite::SqliteStore;

use anyhow::{Result, bail};
use tracing::info;

use crate::model::{Observation, Station, Table};

#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Inserts stations not already present. Returns how many were new.
    async fn insert_stations(&self, rows: &[Station]) -> Result<u64>;

    /// Inserts observations not already present. Returns how many were new.
    async fn insert_observations(&self, rows: &[Observation]) -> Result<u64>;

    /// `SELECT * FROM station`.
    async fn stations(&self) -> Result<Vec<Station>>;

    /// `SELECT * FROM historic WHERE stationcode = ?`, oldest first.
    async fn history(&self, stationcode: &str) -> Result<Vec<Observation>>;

    /// Number of rows currently in `table`.
    async fn count(&self, table: Table) -> Result<i64>;

    /// Creates both tables if they do not exist.
    async fn ensure_schema(&self) -> Result<()>;
}

/// Opens a store for a `postgres://` or `sqlite:` url. Fails on the first error.
pub async fn open(url: &str) -> Result<Box<dyn Store>> {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        Ok(Box::new(PgStore::connect(url).await?))
    } else if url.starts_with("sqlite:") {
        Ok(Box::new(SqliteStore::connect(url).await?))
    } else {
        bail!("unsupported database url scheme (expected postgres:// or sqlite:)")
    }
}

/// Logs the outcome of one batch write.
pub(crate) fn report_write(table: Table, offered: usize, inserted: u64) {
    let skipped = (offered as u64).saturating_sub(inserted);
    info!(
        table = %table,
        offered,
        inserted,
        skipped,
        "Rows written"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_rejects_unknown_scheme() {
        let result = open("mysql://localhost/velib").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_open_sqlite_memory() {
        let store = open("sqlite::memory:").await.unwrap();
        store.ensure_schema().await.unwrap();
        assert_eq!(store.count(Table::Station).await.unwrap(), 0);
    }
}
