//! Normalization of raw feed records into [`Station`] and [`Observation`] rows.
//!
//! Each record is handled on its own. A record that fails to normalize is
//! dropped and reported in [`Transformed::skipped`]; the rest of the batch
//! goes through. No deduplication happens here.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{Observation, Station};
use crate::parser::{RawFeedRecord, RawPayload, parse_record};

/// Flag value the feed uses for "yes".
pub const FLAG_YES: &str = "OUI";
/// Flag value the feed uses for "no".
pub const FLAG_NO: &str = "NON";

/// Why a single record could not be normalized.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("malformed record: {0}")]
    MalformedRecord(#[from] serde_json::Error),
    #[error("expected 2 coordinate values, got {0}")]
    CoordinateCount(usize),
    #[error("field `{field}` has unrecognized flag value {value:?}")]
    InvalidFlag { field: &'static str, value: String },
    #[error("unparseable due date {0:?}")]
    InvalidDueDate(String),
    #[error("field `{field}` value {value} is out of range")]
    OutOfRange { field: &'static str, value: u32 },
}

/// A record dropped during normalization.
#[derive(Debug)]
pub struct SkippedRecord {
    /// Position of the record in the payload.
    pub index: usize,
    /// The source record id, when it could be read.
    pub record_id: Option<String>,
    pub error: TransformError,
}

/// Output of [`transform`]: two row sets in payload order plus the rejects.
#[derive(Debug, Default)]
pub struct Transformed {
    pub stations: Vec<Station>,
    pub observations: Vec<Observation>,
    pub skipped: Vec<SkippedRecord>,
}

/// Splits a payload into station and observation rows.
pub fn transform(payload: RawPayload) -> Transformed {
    let mut out = Transformed {
        stations: Vec::with_capacity(payload.records.len()),
        observations: Vec::with_capacity(payload.records.len()),
        skipped: Vec::new(),
    };

    for (index, value) in payload.records.into_iter().enumerate() {
        let record_id = value
            .get("recordid")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        match normalize(value) {
            Ok((station, observation)) => {
                out.stations.push(station);
                out.observations.push(observation);
            }
            Err(error) => {
                warn!(index, record_id = ?record_id, error = %error, "Skipping feed record");
                out.skipped.push(SkippedRecord {
                    index,
                    record_id,
                    error,
                });
            }
        }
    }

    debug!(
        stations = out.stations.len(),
        observations = out.observations.len(),
        skipped = out.skipped.len(),
        "Payload transformed"
    );

    out
}

/// Normalizes one JSON record into its station and observation rows.
pub fn normalize(value: serde_json::Value) -> Result<(Station, Observation), TransformError> {
    let RawFeedRecord { recordid, fields } = parse_record(value)?;

    let (x, y) = split_coordinates(&fields.coordonnees_geo)?;

    let station = Station {
        stationcode: fields.stationcode.clone(),
        name: fields.name,
        district: fields.nom_arrondissement_communes,
        capacity: to_count("capacity", fields.capacity)?,
        x,
        y,
    };

    let observation = Observation {
        record_id: recordid,
        stationcode: fields.stationcode,
        ebike_count: to_count("ebike", fields.ebike)?,
        mechanical_count: to_count("mechanical", fields.mechanical)?,
        bikes_available: to_count("numbikesavailable", fields.numbikesavailable)?,
        docks_available: to_count("numdocksavailable", fields.numdocksavailable)?,
        renting_open: parse_flag("is_renting", &fields.is_renting)?,
        installed: parse_flag("is_installed", &fields.is_installed)?,
        returning_open: parse_flag("is_returning", &fields.is_returning)?,
        due_at: parse_due_date(&fields.duedate)?,
    };

    Ok((station, observation))
}

/// Splits a `[x, y]` pair into its two scalars.
pub fn split_coordinates(coords: &[f64]) -> Result<(f64, f64), TransformError> {
    match coords {
        [x, y] => Ok((*x, *y)),
        other => Err(TransformError::CoordinateCount(other.len())),
    }
}

/// Maps the feed's `OUI`/`NON` flags to booleans. Anything else is rejected.
pub fn parse_flag(field: &'static str, value: &str) -> Result<bool, TransformError> {
    match value {
        FLAG_YES => Ok(true),
        FLAG_NO => Ok(false),
        other => Err(TransformError::InvalidFlag {
            field,
            value: other.to_string(),
        }),
    }
}

/// Parses the snapshot timestamp. Values without an offset are taken as UTC.
pub fn parse_due_date(value: &str) -> Result<DateTime<Utc>, TransformError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| TransformError::InvalidDueDate(value.to_string()))
}

fn to_count(field: &'static str, value: u32) -> Result<i32, TransformError> {
    i32::try_from(value).map_err(|_| TransformError::OutOfRange { field, value })
}
