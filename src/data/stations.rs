//! Weather station records from the daily observations document
//!
//! The provider's document has no fixed shape: stations may be nested under a
//! `Stations.Station` list, a single `Stations.Station` object, a bare
//! `Stations` list, or the document may itself be a list. This module flattens
//! all of those into one sequence of records and projects each record into a
//! typed [`Station`] for lookup and filtering.

use serde_json::Value;
use tracing::{debug, warn};

/// Field holding the station collection
const COLLECTION_KEYS: [&str; 2] = ["Stations", "stations"];

/// Singular key inside the collection object
const RECORD_KEYS: [&str; 2] = ["Station", "station"];

/// Other top-level keys some payloads use for the record list
const ALTERNATE_KEYS: [&str; 6] = ["stations", "Station", "station", "data", "items", "records"];

/// Keys that may carry the station identifier
const ID_KEYS: [&str; 3] = ["WmoStationNumber", "StationID", "id"];

/// A typed view of one station record
///
/// Only the fields used for lookup are projected; `record` keeps the provider's
/// original record so responses can return it untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    /// WMO station number
    pub id: String,
    pub name_english: Option<String>,
    pub name_thai: Option<String>,
    pub province: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// The record as returned by the provider
    pub record: Value,
}

/// Flattens the observations document into an ordered list of records
///
/// First match wins:
/// 1. `Stations.Station` holding a list (returned as-is) or a single object
///    (wrapped in a one-element list)
/// 2. `Stations` holding a list
/// 3. The document itself being a list
/// 4. A list under one of a few alternate top-level keys
///
/// Anything else yields an empty list and a warning, never an error.
pub fn extract_records(document: &Value) -> Vec<Value> {
    if let Some(collection) = first_field(document, &COLLECTION_KEYS) {
        if let Some(records) = first_field(collection, &RECORD_KEYS) {
            match records {
                Value::Array(items) => return items.clone(),
                Value::Object(_) => return vec![records.clone()],
                _ => {}
            }
        }
        if let Value::Array(items) = collection {
            return items.clone();
        }
    }

    if let Value::Array(items) = document {
        return items.clone();
    }

    for key in ALTERNATE_KEYS {
        if let Some(Value::Array(items)) = document.get(key) {
            debug!(key, "Found station records under alternate key");
            return items.clone();
        }
    }

    warn!(
        shape = document_shape(document),
        "No station records found in upstream document"
    );
    Vec::new()
}

/// Projects every record that carries an identifier into a [`Station`]
pub fn stations_from_document(document: &Value) -> Vec<Station> {
    extract_records(document)
        .into_iter()
        .filter_map(Station::from_record)
        .collect()
}

/// Finds the station with the given identifier
pub fn find_station<'a>(stations: &'a [Station], id: &str) -> Option<&'a Station> {
    let id = id.trim();
    stations.iter().find(|station| station.id == id)
}

/// Stations whose province contains `query`, ignoring case
pub fn filter_by_province<'a>(stations: &'a [Station], query: &str) -> Vec<&'a Station> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    stations
        .iter()
        .filter(|station| {
            station
                .province
                .as_deref()
                .is_some_and(|province| province.to_lowercase().contains(&query))
        })
        .collect()
}

/// Sorted, deduplicated station identifiers
pub fn known_ids(stations: &[Station]) -> Vec<String> {
    let mut ids: Vec<String> = stations.iter().map(|s| s.id.clone()).collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Sorted, deduplicated province names
pub fn known_provinces(stations: &[Station]) -> Vec<String> {
    let mut provinces: Vec<String> = stations
        .iter()
        .filter_map(|s| s.province.clone())
        .collect();
    provinces.sort();
    provinces.dedup();
    provinces
}

impl Station {
    /// Builds a station from a provider record
    ///
    /// Returns `None` for records that aren't objects or have no usable identifier.
    pub fn from_record(record: Value) -> Option<Self> {
        if !record.is_object() {
            debug!("Skipping non-object station record");
            return None;
        }

        let Some(id) = ID_KEYS
            .iter()
            .find_map(|key| record.get(key).and_then(text_value))
        else {
            debug!("Skipping station record without an identifier");
            return None;
        };

        Some(Self {
            id,
            name_english: record.get("StationNameEnglish").and_then(text_value),
            name_thai: record.get("StationNameThai").and_then(text_value),
            province: first_field(&record, &["Province", "province"]).and_then(text_value),
            latitude: first_field(&record, &["Latitude", "latitude", "lat"]).and_then(number_value),
            longitude: first_field(&record, &["Longitude", "longitude", "lon"])
                .and_then(number_value),
            record,
        })
    }
}

fn first_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| value.get(key))
}

/// Reads a non-empty string, accepting numbers and `{"#text": ...}` wrappers
fn text_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => return map.get("#text").and_then(text_value),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Reads a number from a number, numeric string, or `{"#text": ...}` wrapper
fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(map) => map.get("#text").and_then(number_value),
        _ => None,
    }
}

fn document_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_document() -> Value {
        json!({
            "Header": {"Title": "Weather Today", "LastBuildDate": "2024-07-15 07:00:00"},
            "Stations": {
                "Station": [
                    {
                        "WmoStationNumber": "48455",
                        "StationNameThai": "กรุงเทพมหานคร",
                        "StationNameEnglish": "BANGKOK METROPOLIS",
                        "Province": "Bangkok",
                        "Latitude": {"@Unit": "deg", "#text": "13.726"},
                        "Longitude": {"@Unit": "deg", "#text": "100.560"}
                    },
                    {
                        "WmoStationNumber": 48327,
                        "StationNameEnglish": "CHIANG MAI",
                        "Province": "Chiang Mai",
                        "Latitude": 18.79,
                        "Longitude": 98.98
                    },
                    {
                        "WmoStationNumber": "48328",
                        "StationNameEnglish": "CHIANG MAI AGROMET",
                        "Province": "Chiang Mai"
                    },
                    {
                        "StationNameEnglish": "NO ID STATION",
                        "Province": "Nowhere"
                    }
                ]
            }
        })
    }

    #[test]
    fn test_extract_nested_list() {
        let a = json!({"id": "a"});
        let b = json!({"id": "b"});
        let document = json!({"Stations": {"Station": [a.clone(), b.clone()]}});

        assert_eq!(extract_records(&document), vec![a, b]);
    }

    #[test]
    fn test_extract_nested_single_object() {
        let a = json!({"id": "a"});
        let document = json!({"Stations": {"Station": a.clone()}});

        assert_eq!(extract_records(&document), vec![a]);
    }

    #[test]
    fn test_extract_collection_list() {
        let a = json!({"id": "a"});
        let b = json!({"id": "b"});
        let document = json!({"Stations": [a.clone(), b.clone()]});

        assert_eq!(extract_records(&document), vec![a, b]);
    }

    #[test]
    fn test_extract_top_level_list() {
        let document = json!([{"id": "a"}, {"id": "b"}, {"id": "c"}]);

        assert_eq!(extract_records(&document).len(), 3);
    }

    #[test]
    fn test_extract_alternate_key() {
        let document = json!({"data": [{"id": "a"}]});

        assert_eq!(extract_records(&document), vec![json!({"id": "a"})]);
    }

    #[test]
    fn test_extract_lowercase_collection() {
        let document = json!({"stations": {"station": {"id": "a"}}});

        assert_eq!(extract_records(&document), vec![json!({"id": "a"})]);
    }

    #[test]
    fn test_extract_empty_document_returns_empty() {
        assert!(extract_records(&json!({})).is_empty());
        assert!(extract_records(&Value::Null).is_empty());
        assert!(extract_records(&json!({"Stations": "unavailable"})).is_empty());
    }

    #[test]
    fn test_nested_list_wins_over_alternates() {
        let document = json!({
            "Stations": {"Station": [{"id": "nested"}]},
            "data": [{"id": "alternate"}]
        });

        assert_eq!(extract_records(&document), vec![json!({"id": "nested"})]);
    }

    #[test]
    fn test_station_projection() {
        let stations = stations_from_document(&sample_document());

        // The record without an identifier is skipped
        assert_eq!(stations.len(), 3);

        let bangkok = &stations[0];
        assert_eq!(bangkok.id, "48455");
        assert_eq!(bangkok.name_english.as_deref(), Some("BANGKOK METROPOLIS"));
        assert_eq!(bangkok.name_thai.as_deref(), Some("กรุงเทพมหานคร"));
        assert!((bangkok.latitude.unwrap() - 13.726).abs() < 0.0001);
        assert!((bangkok.longitude.unwrap() - 100.56).abs() < 0.0001);

        let chiang_mai = &stations[1];
        assert_eq!(chiang_mai.id, "48327");
        assert!((chiang_mai.latitude.unwrap() - 18.79).abs() < 0.0001);
        assert_eq!(chiang_mai.record["StationNameEnglish"], "CHIANG MAI");
    }

    #[test]
    fn test_from_record_rejects_non_objects() {
        assert!(Station::from_record(json!("48455")).is_none());
        assert!(Station::from_record(json!({"WmoStationNumber": ""})).is_none());
    }

    #[test]
    fn test_find_station() {
        let stations = stations_from_document(&sample_document());

        assert_eq!(
            find_station(&stations, " 48327 ").map(|s| s.id.as_str()),
            Some("48327")
        );
        assert!(find_station(&stations, "99999").is_none());
        assert!(find_station(&stations, "").is_none());
    }

    #[test]
    fn test_filter_by_province_is_case_insensitive_substring() {
        let stations = stations_from_document(&sample_document());

        let chiang_mai: Vec<&str> = filter_by_province(&stations, "chiang")
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(chiang_mai, vec!["48327", "48328"]);

        assert_eq!(filter_by_province(&stations, "BANGKOK").len(), 1);
        assert!(filter_by_province(&stations, "Phuket").is_empty());
        assert!(filter_by_province(&stations, "  ").is_empty());
    }

    #[test]
    fn test_known_ids_and_provinces_are_sorted_and_unique() {
        let stations = stations_from_document(&sample_document());

        assert_eq!(known_ids(&stations), vec!["48327", "48328", "48455"]);
        assert_eq!(known_provinces(&stations), vec!["Bangkok", "Chiang Mai"]);
    }
}
