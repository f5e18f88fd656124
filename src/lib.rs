//! # Trip Insights
//!
//! Spatial clustering and trip statistics for collections of GPS trip traces.
//!
//! This library provides:
//! - Density-based clustering of waypoints, trip starts and trip ends
//! - Cluster geometry (centroid + haversine covering radius)
//! - Route-level statistics (distance, date range, mode/purpose frequencies)
//! - Cluster attribution (visit count, dwell time, most likely hour)
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel processing with rayon
//! - **`cli`** - Build the `trip-insights` command-line tool
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use trip_insights::{build_clusters, compute_route_statistics, ClusterConfig, loader};
//!
//! let json = r#"{
//!     "commuter": [
//!         {
//!             "coordinates": [
//!                 [49.2800, -123.1200, "2024-01-01T08:00:00Z"],
//!                 [49.2805, -123.1205, "2024-01-01T08:10:00Z"]
//!             ],
//!             "mode_of_travel": "Bike"
//!         }
//!     ]
//! }"#;
//!
//! let loaded = loader::load_from_str(json).unwrap();
//! let collection = loaded.document.first().unwrap();
//!
//! let clusters = build_clusters(collection, &ClusterConfig::default()).unwrap();
//! let stats = compute_route_statistics(collection);
//!
//! assert_eq!(stats.total_trips, 1);
//! assert_eq!(stats.most_common_mode.as_deref(), Some("Bike"));
//! assert!(clusters.all.is_empty()); // two points cannot satisfy min_points = 8
//! ```

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TripInsightsError};

// Union-Find data structure for connecting core points
pub mod union_find;
pub use union_find::UnionFind;

// Geographic utilities (haversine, centroid, covering radius, membership)
pub mod geo_utils;

// Density-based clustering (DBSCAN)
pub mod density;
pub use density::{dbscan, DensityClusters};

// Cluster sets for waypoints, trip starts and trip ends
pub mod clusters;
pub use clusters::{build_clusters, Cluster, ClusterConfig, ClusterSets};

// Route-level statistics
pub mod stats;
pub use stats::{
    compute_map_region, compute_route_statistics, summarize_trip, DailyCount, DateRange,
    FrequencyTable, MapRegion, RegionConfig, RouteStatistics, TripSummary,
};

// Visit / dwell / hour-of-day attribution per cluster
pub mod attribution;
pub use attribution::{attribute_cluster, attribute_clusters, ClusterAttribution, HourOfDay};

// Route document parsing
pub mod loader;
pub use loader::{LoadReport, LoadedDocument};

// Stateful engine with recomputation cache
pub mod engine;
pub use engine::{analyze_collection, AttributionSets, CollectionAnalysis, EngineStats, TripEngine};

// Algorithm toolbox - flat access to every algorithm
pub mod algorithms;

// ============================================================================
// Constants
// ============================================================================

/// Label used for trips without a travel mode or purpose.
pub const NOT_SELECTED: &str = "Not Selected";

// ============================================================================
// Core Types
// ============================================================================

/// Instant with the UTC offset it was recorded in.
pub type Timestamp = DateTime<FixedOffset>;

/// A bare latitude/longitude pair, used as clustering input.
///
/// # Example
/// ```
/// use trip_insights::GpsPoint;
/// let point = GpsPoint::new(49.2827, -123.1207); // Vancouver
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a point set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// A position inside a trip, with the instant it was recorded.
///
/// `timestamp` is `None` when the source carried no usable time. Such
/// coordinates still count for distance, bounds and clustering, and are
/// ignored by every time-based figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: Option<Timestamp>,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64, timestamp: Timestamp) -> Self {
        Self {
            latitude,
            longitude,
            timestamp: Some(timestamp),
        }
    }

    /// A coordinate without a usable timestamp.
    pub fn untimed(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp: None,
        }
    }

    /// Build a coordinate from a timestamp string, see [`parse_timestamp`].
    pub fn parse(latitude: f64, longitude: f64, timestamp: &str) -> Result<Self> {
        Ok(Self::new(latitude, longitude, parse_timestamp(timestamp)?))
    }

    /// The position without its timestamp.
    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// Parse an ISO-8601 timestamp.
///
/// RFC 3339 strings keep their offset. Strings without an offset
/// (`2024-01-01T08:00:00`, `2024-01-01 08:00:00.5`) are read as UTC.
pub fn parse_timestamp(value: &str) -> Result<Timestamp> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    Err(TripInsightsError::InvalidTimestamp {
        value: value.to_string(),
    })
}

/// Mode of travel recorded for a trip.
///
/// Labels are matched exactly against the survey's option list: `"Walk"` is
/// [`TravelMode::Walk`], `"walk"` is not. Anything else is kept verbatim in
/// [`TravelMode::Unlisted`] so frequency tables count it under its own text.
/// Serialized as the label string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TravelMode {
    AutoDriver,
    AutoPassenger,
    TransitBus,
    SkyTrain,
    WestCoastExpress,
    SeaBus,
    Walk,
    Bike,
    SharedBike,
    Taxi,
    CarShare,
    HandyDart,
    RideHailing,
    Motorcycle,
    SharedEScooter,
    SchoolBus,
    /// The survey's own "Other" option
    Other,
    Transit,
    NotSelected,
    Unlisted(String),
}

impl TravelMode {
    /// Every listed mode, in survey order.
    pub const LISTED: [TravelMode; 19] = [
        TravelMode::AutoDriver,
        TravelMode::AutoPassenger,
        TravelMode::TransitBus,
        TravelMode::SkyTrain,
        TravelMode::WestCoastExpress,
        TravelMode::SeaBus,
        TravelMode::Walk,
        TravelMode::Bike,
        TravelMode::SharedBike,
        TravelMode::Taxi,
        TravelMode::CarShare,
        TravelMode::HandyDart,
        TravelMode::RideHailing,
        TravelMode::Motorcycle,
        TravelMode::SharedEScooter,
        TravelMode::SchoolBus,
        TravelMode::Other,
        TravelMode::Transit,
        TravelMode::NotSelected,
    ];

    /// Display label, also used as the frequency-table key.
    pub fn label(&self) -> &str {
        match self {
            TravelMode::AutoDriver => "Auto Driver",
            TravelMode::AutoPassenger => "Auto Passenger",
            TravelMode::TransitBus => "Transit Bus",
            TravelMode::SkyTrain => "SkyTrain",
            TravelMode::WestCoastExpress => "West Coast Express",
            TravelMode::SeaBus => "SeaBus",
            TravelMode::Walk => "Walk",
            TravelMode::Bike => "Bike",
            TravelMode::SharedBike => "Shared Bike",
            TravelMode::Taxi => "Taxi",
            TravelMode::CarShare => "Car Share",
            TravelMode::HandyDart => "HandyDart",
            TravelMode::RideHailing => "Ride-hailing",
            TravelMode::Motorcycle => "Motorcycle",
            TravelMode::SharedEScooter => "Shared E-scooter",
            TravelMode::SchoolBus => "School Bus",
            TravelMode::Other => "Other",
            TravelMode::Transit => "Transit",
            TravelMode::NotSelected => NOT_SELECTED,
            TravelMode::Unlisted(label) => label,
        }
    }

    /// Map a label to its mode. Only surrounding whitespace is ignored.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::LISTED
            .iter()
            .find(|mode| mode.label() == label)
            .cloned()
            .unwrap_or_else(|| TravelMode::Unlisted(label.to_string()))
    }
}

impl FromStr for TravelMode {
    type Err = TripInsightsError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(TripInsightsError::InvalidInput {
                message: "empty travel mode".to_string(),
            });
        }
        Ok(Self::from_label(s))
    }
}

impl From<String> for TravelMode {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<TravelMode> for String {
    fn from(mode: TravelMode) -> Self {
        match mode {
            TravelMode::Unlisted(label) => label,
            listed => listed.label().to_string(),
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One recorded journey: an ordered coordinate sequence plus optional categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trip {
    /// Chronologically ordered coordinates
    pub coordinates: Vec<Coordinate>,
    pub mode: Option<TravelMode>,
    pub purpose: Option<String>,
    /// Opaque identifier (participant code, device id, ...)
    pub identifier: Option<String>,
}

impl Trip {
    pub fn new(coordinates: Vec<Coordinate>) -> Self {
        Self {
            coordinates,
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: TravelMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn start(&self) -> Option<&Coordinate> {
        self.coordinates.first()
    }

    pub fn end(&self) -> Option<&Coordinate> {
        self.coordinates.last()
    }

    /// Positions of every coordinate, timed or not.
    pub fn points(&self) -> Vec<GpsPoint> {
        self.coordinates.iter().map(Coordinate::point).collect()
    }

    /// Mode label, or "Not Selected".
    pub fn mode_label(&self) -> &str {
        self.mode.as_ref().map_or(NOT_SELECTED, TravelMode::label)
    }

    /// Purpose label, or "Not Selected".
    pub fn purpose_label(&self) -> &str {
        self.purpose.as_deref().unwrap_or(NOT_SELECTED)
    }

    /// Sum of haversine distances between consecutive coordinates, in kilometers.
    pub fn distance_km(&self) -> f64 {
        self.coordinates
            .windows(2)
            .map(|w| geo_utils::haversine_distance(&w[0].point(), &w[1].point()))
            .sum()
    }

    /// First timestamp of the trip, skipping untimed coordinates.
    pub fn start_time(&self) -> Option<Timestamp> {
        self.coordinates.iter().find_map(|c| c.timestamp)
    }

    /// Minutes between the first and last timed coordinate (0 for fewer than 2).
    pub fn duration_minutes(&self) -> f64 {
        let times: Vec<Timestamp> = self.coordinates.iter().filter_map(|c| c.timestamp).collect();
        match (times.first(), times.last()) {
            (Some(first), Some(last)) if times.len() >= 2 => minutes_between(first, last),
            _ => 0.0,
        }
    }
}

/// Signed minutes from `start` to `end`.
pub(crate) fn minutes_between(start: &Timestamp, end: &Timestamp) -> f64 {
    (*end - *start).num_milliseconds() as f64 / 60_000.0
}

/// A named group of trips analyzed together.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteCollection {
    pub name: String,
    pub trips: Vec<Trip>,
}

impl RouteCollection {
    pub fn new(name: impl Into<String>, trips: Vec<Trip>) -> Self {
        Self {
            name: name.into(),
            trips,
        }
    }

    /// True when there is no coordinate in any trip.
    pub fn is_empty(&self) -> bool {
        self.trips.iter().all(|t| t.coordinates.is_empty())
    }

    pub fn coordinate_count(&self) -> usize {
        self.trips.iter().map(|t| t.coordinates.len()).sum()
    }

    /// Every coordinate of every trip, flattened in trip order.
    pub fn all_points(&self) -> Vec<GpsPoint> {
        self.trips
            .iter()
            .flat_map(|t| t.coordinates.iter().map(Coordinate::point))
            .collect()
    }

    /// First coordinate of each non-empty trip.
    pub fn start_points(&self) -> Vec<GpsPoint> {
        self.trips
            .iter()
            .filter_map(|t| t.start().map(Coordinate::point))
            .collect()
    }

    /// Last coordinate of each non-empty trip.
    pub fn end_points(&self) -> Vec<GpsPoint> {
        self.trips
            .iter()
            .filter_map(|t| t.end().map(Coordinate::point))
            .collect()
    }

    /// Hash of the collection name and every field of every trip.
    ///
    /// Used as the cache key for analysis results: any change to the trips
    /// changes the hash.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.name.hash(&mut hasher);
        self.trips.len().hash(&mut hasher);
        for trip in &self.trips {
            trip.coordinates.len().hash(&mut hasher);
            for c in &trip.coordinates {
                c.latitude.to_bits().hash(&mut hasher);
                c.longitude.to_bits().hash(&mut hasher);
                c.timestamp.hash(&mut hasher);
                c.timestamp
                    .map(|t| t.offset().local_minus_utc())
                    .hash(&mut hasher);
            }
            trip.mode.hash(&mut hasher);
            trip.purpose.hash(&mut hasher);
            trip.identifier.hash(&mut hasher);
        }
        hasher.finish()
    }
}

/// Every route collection of a document, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteDocument {
    pub collections: Vec<RouteCollection>,
}

impl RouteDocument {
    pub fn new(collections: Vec<RouteCollection>) -> Self {
        Self { collections }
    }

    pub fn get(&self, name: &str) -> Option<&RouteCollection> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// The first collection in document order (the default selection).
    pub fn first(&self) -> Option<&RouteCollection> {
        self.collections.first()
    }

    pub fn names(&self) -> Vec<&str> {
        self.collections.iter().map(|c| c.name.as_str()).collect()
    }

    /// Insert a collection, replacing any collection with the same name in place.
    pub fn upsert(&mut self, collection: RouteCollection) {
        match self
            .collections
            .iter_mut()
            .find(|c| c.name == collection.name)
        {
            Some(existing) => *existing = collection,
            None => self.collections.push(collection),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<RouteCollection> {
        let idx = self.collections.iter().position(|c| c.name == name)?;
        Some(self.collections.remove(idx))
    }
}

// ============================================================================
// Tests
// ============================================================================
