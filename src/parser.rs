//! JSON decoding of the availability feed.
//!
//! The body is decoded in two steps: the envelope first, then each record on
//! its own, so that one malformed record cannot sink the whole payload.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Decoded feed body: one still-untyped JSON object per station.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPayload {
    #[serde(default)]
    pub nhits: Option<u64>,
    pub records: Vec<serde_json::Value>,
}

/// A single feed record as published, before normalization.
///
/// Bookkeeping keys such as `datasetid` and `record_timestamp` are not
/// declared and are dropped on decode.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFeedRecord {
    pub recordid: String,
    pub fields: RawFields,
}

/// The nested field bag of a [`RawFeedRecord`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawFields {
    pub stationcode: String,
    pub name: String,
    pub capacity: u32,
    pub nom_arrondissement_communes: String,
    pub is_installed: String,
    pub is_renting: String,
    pub is_returning: String,
    pub ebike: u32,
    pub mechanical: u32,
    pub numbikesavailable: u32,
    pub numdocksavailable: u32,
    pub duedate: String,
    pub coordonnees_geo: Vec<f64>,
}

/// Decodes the feed envelope from raw bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not JSON or carry no `records` array.
pub fn parse_payload(bytes: &[u8]) -> Result<RawPayload> {
    serde_json::from_slice(bytes).context("feed body is not a valid records payload")
}

/// Decodes one record of the envelope into its typed form.
pub fn parse_record(value: serde_json::Value) -> serde_json::Result<RawFeedRecord> {
    serde_json::from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_empty_records() {
        let payload = parse_payload(br#"{"nhits": 0, "records": []}"#).unwrap();
        assert_eq!(payload.nhits, Some(0));
        assert!(payload.records.is_empty());
    }

    #[test]
    fn test_parse_invalid_bytes() {
        assert!(parse_payload(&[0xFF, 0xFE, 0x00, 0x01]).is_err());
    }

    #[test]
    fn test_parse_missing_records_key() {
        let result = parse_payload(br#"{"error": "quota exceeded"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_record_drops_dataset_id() {
        let record = parse_record(json!({
            "datasetid": "velib-disponibilite-en-temps-reel",
            "recordid": "abc",
            "record_timestamp": "2024-01-01T00:00:00+00:00",
            "fields": {
                "stationcode": "16107",
                "name": "Benjamin Godard - Victor Hugo",
                "capacity": 35,
                "nom_arrondissement_communes": "Paris",
                "is_installed": "OUI",
                "is_renting": "OUI",
                "is_returning": "OUI",
                "ebike": 1,
                "mechanical": 2,
                "numbikesavailable": 3,
                "numdocksavailable": 32,
                "duedate": "2024-01-01T00:00:00+00:00",
                "coordonnees_geo": [48.865983, 2.275725]
            }
        }))
        .unwrap();

        assert_eq!(record.recordid, "abc");
        assert_eq!(record.fields.stationcode, "16107");
        assert_eq!(record.fields.coordonnees_geo.len(), 2);
    }

    #[test]
    fn test_parse_record_rejects_negative_count() {
        let result = parse_record(json!({
            "recordid": "abc",
            "fields": { "stationcode": "1", "ebike": -1 }
        }));
        assert!(result.is_err());
    }
}
