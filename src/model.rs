//! Normalized rows written to the `station` and `historic` tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One bike-sharing station: the slowly-changing dimension.
///
/// Keyed by `stationcode`. Serialized field names match the `station`
/// table columns so CSV/JSON exports line up with `SELECT * FROM station`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Station {
    pub stationcode: String,
    pub name: String,
    #[serde(rename = "nom_arrondissement_communes")]
    #[sqlx(rename = "nom_arrondissement_communes")]
    pub district: String,
    pub capacity: i32,
    #[serde(rename = "coordonnee_x")]
    #[sqlx(rename = "coordonnee_x")]
    pub x: f64,
    #[serde(rename = "coordonnee_y")]
    #[sqlx(rename = "coordonnee_y")]
    pub y: f64,
}

/// Availability of a single station at one feed snapshot.
///
/// Keyed by `record_id`; immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Observation {
    pub record_id: String,
    pub stationcode: String,
    #[serde(rename = "ebike")]
    #[sqlx(rename = "ebike")]
    pub ebike_count: i32,
    #[serde(rename = "mechanical")]
    #[sqlx(rename = "mechanical")]
    pub mechanical_count: i32,
    #[serde(rename = "numbikesavailable")]
    #[sqlx(rename = "numbikesavailable")]
    pub bikes_available: i32,
    #[serde(rename = "numdocksavailable")]
    #[sqlx(rename = "numdocksavailable")]
    pub docks_available: i32,
    #[serde(rename = "is_renting")]
    #[sqlx(rename = "is_renting")]
    pub renting_open: bool,
    #[serde(rename = "is_installed")]
    #[sqlx(rename = "is_installed")]
    pub installed: bool,
    #[serde(rename = "is_returning")]
    #[sqlx(rename = "is_returning")]
    pub returning_open: bool,
    #[serde(rename = "duedate")]
    #[sqlx(rename = "duedate")]
    pub due_at: DateTime<Utc>,
}

/// The two tables this crate writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Station,
    Historic,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Station => "station",
            Table::Historic => "historic",
        }
    }

    pub fn primary_key(self) -> &'static str {
        match self {
            Table::Station => "stationcode",
            Table::Historic => "record_id",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
