//! Export of stored rows for the read-only consumer queries.
//!
//! Supports pretty-printing, JSON and CSV.

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::fmt::Debug;
use std::fs::File;
use tracing::{debug, info};

/// Logs rows using Rust's debug pretty-print format.
pub fn print_pretty<T: Debug>(rows: &[T]) {
    for row in rows {
        info!("{:#?}", row);
    }
}

/// Logs rows as a pretty-printed JSON array.
pub fn print_json<T: Serialize>(rows: &[T]) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(rows)?);
    Ok(())
}

/// Writes rows to a CSV file at `path`, header first, replacing any existing file.
pub fn write_csv<T: Serialize>(path: &str, rows: &[T]) -> Result<()> {
    debug!(path, rows = rows.len(), "Writing CSV export");

    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}
