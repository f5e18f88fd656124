//! Route document loading.
//!
//! A route document is a JSON object keyed by collection name. Each value is an
//! array of trip objects:
//!
//! ```json
//! {
//!   "participant-01": [
//!     {
//!       "coordinates": [[49.28, -123.12, "2024-01-01T08:00:00Z"]],
//!       "mode_of_travel": "Bike",
//!       "purpose_of_travel": "Work",
//!       "identifier": "P01"
//!     }
//!   ]
//! }
//! ```
//!
//! Collection order follows the document. Coordinates without numeric
//! latitude/longitude are skipped and reported. A coordinate with a missing
//! or unparseable timestamp keeps its position with `timestamp: None` and is
//! counted in [`LoadReport::untimed_coordinates`]. Neither fails the load.

use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, TripInsightsError};
use crate::{parse_timestamp, Coordinate, RouteCollection, RouteDocument, Trip};

/// Counts of what a load kept and what it skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub collections: usize,
    pub trips: usize,
    pub coordinates: usize,
    pub skipped_coordinates: usize,
    /// Kept coordinates whose timestamp was missing or unparseable
    pub untimed_coordinates: usize,
    /// Trip entries that were not JSON objects
    pub skipped_trips: usize,
    /// Collection values that were not arrays
    pub skipped_collections: usize,
    /// One line per skipped entry or untimed coordinate
    pub warnings: Vec<String>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped_coordinates == 0
            && self.untimed_coordinates == 0
            && self.skipped_trips == 0
            && self.skipped_collections == 0
    }

    fn skip(&mut self, message: String) {
        warn!("[Loader] Skipped {}", message);
        self.warnings.push(message);
    }

    fn untimed(&mut self, message: String) {
        warn!("[Loader] Kept without timestamp: {}", message);
        self.untimed_coordinates += 1;
        self.warnings.push(message);
    }
}

/// A parsed document with its load report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedDocument {
    pub document: RouteDocument,
    pub report: LoadReport,
}

/// Parse a route document from a JSON string.
///
/// # Errors
/// `Json` for invalid JSON, `InvalidInput` when the top level is not an object.
pub fn load_from_str(json: &str) -> Result<LoadedDocument> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Object(root) = value else {
        return Err(TripInsightsError::InvalidInput {
            message: "route document must be a JSON object keyed by collection name".to_string(),
        });
    };
    Ok(load_from_map(root))
}

/// Read and parse a route document file.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<LoadedDocument> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)?;
    let loaded = load_from_str(&json)?;
    info!(
        "[Loader] Loaded {} collections, {} trips from {}",
        loaded.report.collections,
        loaded.report.trips,
        path.display()
    );
    Ok(loaded)
}

fn load_from_map(root: Map<String, Value>) -> LoadedDocument {
    let mut report = LoadReport::default();
    let mut collections = Vec::with_capacity(root.len());

    for (name, value) in root {
        let Value::Array(entries) = value else {
            report.skipped_collections += 1;
            report.skip(format!("collection '{}': not an array of trips", name));
            continue;
        };

        let mut trips = Vec::with_capacity(entries.len());
        for (trip_index, entry) in entries.iter().enumerate() {
            let Value::Object(fields) = entry else {
                report.skipped_trips += 1;
                report.skip(format!("collection '{}' trip {}: not an object", name, trip_index));
                continue;
            };
            let trip = parse_trip(&name, trip_index, fields, &mut report);
            report.coordinates += trip.coordinates.len();
            trips.push(trip);
        }

        report.trips += trips.len();
        collections.push(RouteCollection::new(name, trips));
    }

    report.collections = collections.len();
    LoadedDocument {
        document: RouteDocument::new(collections),
        report,
    }
}

fn parse_trip(
    collection: &str,
    trip_index: usize,
    fields: &Map<String, Value>,
    report: &mut LoadReport,
) -> Trip {
    let raw_coordinates = fields
        .get("coordinates")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut coordinates = Vec::with_capacity(raw_coordinates.len());
    for (coordinate_index, raw) in raw_coordinates.iter().enumerate() {
        match parse_coordinate(raw, trip_index, coordinate_index) {
            Ok((coord, time_error)) => {
                if let Some(message) = time_error {
                    report.untimed(format!(
                        "collection '{}' trip {} coordinate {}: {}",
                        collection, trip_index, coordinate_index, message
                    ));
                }
                coordinates.push(coord);
            }
            Err(e) => {
                report.skipped_coordinates += 1;
                report.skip(format!("collection '{}': {}", collection, e));
            }
        }
    }

    Trip {
        coordinates,
        mode: non_empty_str(fields.get("mode_of_travel")).and_then(|s| s.parse().ok()),
        purpose: non_empty_str(fields.get("purpose_of_travel")).map(str::to_string),
        identifier: match fields.get("identifier") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        },
    }
}

/// Accepts `[lat, lng, timestamp]` or `{"latitude", "longitude", "timestamp"}`.
///
/// A bad timestamp does not reject the coordinate: it comes back untimed
/// together with the reason.
fn parse_coordinate(
    raw: &Value,
    trip_index: usize,
    coordinate_index: usize,
) -> Result<(Coordinate, Option<String>)> {
    let malformed = |message: &str| TripInsightsError::MalformedCoordinate {
        trip_index,
        coordinate_index,
        message: message.to_string(),
    };

    let (lat, lng, ts) = match raw {
        Value::Array(items) => (items.first(), items.get(1), items.get(2)),
        Value::Object(obj) => (obj.get("latitude"), obj.get("longitude"), obj.get("timestamp")),
        _ => return Err(malformed("expected [latitude, longitude, timestamp]")),
    };

    let latitude = finite_number(lat).ok_or_else(|| malformed("latitude is not a number"))?;
    let longitude = finite_number(lng).ok_or_else(|| malformed("longitude is not a number"))?;
    match ts.and_then(Value::as_str).map(parse_timestamp) {
        Some(Ok(timestamp)) => Ok((Coordinate::new(latitude, longitude, timestamp), None)),
        Some(Err(e)) => Ok((Coordinate::untimed(latitude, longitude), Some(e.to_string()))),
        None => Ok((
            Coordinate::untimed(latitude, longitude),
            Some("timestamp is not a string".to_string()),
        )),
    }
}

fn finite_number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
