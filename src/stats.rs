//! # Trip Statistics
//!
//! Route-level aggregates over every trip of a collection:
//! - Trip, coordinate and distance totals
//! - Date range across all coordinate timestamps
//! - Purpose and mode frequency tables with their most common label
//! - Trips per calendar day (for charting)
//!
//! Also provides per-trip summaries and the map region enclosing a collection.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::geo_utils::compute_bounds;
use crate::{minutes_between, Coordinate, GpsPoint, RouteCollection, Timestamp, Trip};

// ============================================================================
// Frequency Table
// ============================================================================

/// One row of a [`FrequencyTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub label: String,
    pub count: usize,
}

/// Label counts kept in order of first occurrence.
///
/// Ties for the most common label go to the label inserted first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<FrequencyEntry>", into = "Vec<FrequencyEntry>")]
pub struct FrequencyTable {
    entries: Vec<FrequencyEntry>,
    index: HashMap<String, usize>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one occurrence of `label`.
    pub fn increment(&mut self, label: &str) {
        match self.index.get(label) {
            Some(&i) => self.entries[i].count += 1,
            None => {
                self.index.insert(label.to_string(), self.entries.len());
                self.entries.push(FrequencyEntry {
                    label: label.to_string(),
                    count: 1,
                });
            }
        }
    }

    pub fn get(&self, label: &str) -> usize {
        self.index
            .get(label)
            .map_or(0, |&i| self.entries[i].count)
    }

    /// Label with the highest count; the earliest inserted wins ties.
    pub fn most_common(&self) -> Option<&str> {
        let mut best: Option<&FrequencyEntry> = None;
        for entry in &self.entries {
            if best.map_or(true, |b| entry.count > b.count) {
                best = Some(entry);
            }
        }
        best.map(|e| e.label.as_str())
    }

    /// Entries in order of first occurrence.
    pub fn entries(&self) -> &[FrequencyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }
}

impl From<Vec<FrequencyEntry>> for FrequencyTable {
    fn from(entries: Vec<FrequencyEntry>) -> Self {
        let mut table = FrequencyTable::new();
        for entry in entries {
            match table.index.get(&entry.label) {
                Some(&i) => table.entries[i].count += entry.count,
                None => {
                    table.index.insert(entry.label.clone(), table.entries.len());
                    table.entries.push(entry);
                }
            }
        }
        table
    }
}

impl From<FrequencyTable> for Vec<FrequencyEntry> {
    fn from(table: FrequencyTable) -> Self {
        table.entries
    }
}

// ============================================================================
// Route Statistics
// ============================================================================

/// Earliest and latest timestamp of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DateRange {
    /// The collection has no coordinates
    NoData,
    Span { start: Timestamp, end: Timestamp },
}

impl DateRange {
    /// Widen the range to include `ts`.
    fn include(self, ts: Timestamp) -> Self {
        match self {
            DateRange::NoData => DateRange::Span { start: ts, end: ts },
            DateRange::Span { start, end } => DateRange::Span {
                start: start.min(ts),
                end: end.max(ts),
            },
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, DateRange::NoData)
    }

    /// Minutes between start and end, `None` without data.
    pub fn duration_minutes(&self) -> Option<f64> {
        match self {
            DateRange::NoData => None,
            DateRange::Span { start, end } => Some(minutes_between(start, end)),
        }
    }

    /// `"YYYY-MM-DD - YYYY-MM-DD"` (UTC dates) or `"No data"`.
    pub fn label(&self) -> String {
        match self {
            DateRange::NoData => "No data".to_string(),
            DateRange::Span { start, end } => format!(
                "{} - {}",
                start.naive_utc().date(),
                end.naive_utc().date()
            ),
        }
    }
}

/// Number of trips that started on a calendar day (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub trips: usize,
}

/// Aggregate statistics for one route collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStatistics {
    pub total_trips: usize,
    /// Sum of consecutive-coordinate haversine distances over all trips
    pub total_distance_km: f64,
    pub total_coordinates: usize,
    pub date_range: DateRange,
    /// `None` for a collection without trips
    pub most_common_purpose: Option<String>,
    /// `None` for a collection without trips
    pub most_common_mode: Option<String>,
    pub purpose_counts: FrequencyTable,
    pub mode_counts: FrequencyTable,
    /// Trips per day of their first coordinate, ascending
    pub trips_per_day: Vec<DailyCount>,
}

/// Compute the statistics of a route collection.
///
/// Never fails: an empty collection yields zero totals, a
/// [`DateRange::NoData`] range and no most common labels.
///
/// # Example
/// ```
/// use trip_insights::{compute_route_statistics, RouteCollection};
///
/// let stats = compute_route_statistics(&RouteCollection::default());
/// assert_eq!(stats.total_trips, 0);
/// assert!(stats.date_range.is_no_data());
/// ```
pub fn compute_route_statistics(collection: &RouteCollection) -> RouteStatistics {
    let mut total_distance_km = 0.0;
    let mut total_coordinates = 0;
    let mut date_range = DateRange::NoData;
    let mut purpose_counts = FrequencyTable::new();
    let mut mode_counts = FrequencyTable::new();
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();

    for trip in &collection.trips {
        total_coordinates += trip.coordinates.len();
        total_distance_km += trip.distance_km();

        for ts in trip.coordinates.iter().filter_map(|c| c.timestamp) {
            date_range = date_range.include(ts);
        }

        purpose_counts.increment(trip.purpose_label());
        mode_counts.increment(trip.mode_label());

        if let Some(start) = trip.start_time() {
            *per_day.entry(start.naive_utc().date()).or_insert(0) += 1;
        }
    }

    let stats = RouteStatistics {
        total_trips: collection.trips.len(),
        total_distance_km,
        total_coordinates,
        date_range,
        most_common_purpose: purpose_counts.most_common().map(str::to_string),
        most_common_mode: mode_counts.most_common().map(str::to_string),
        purpose_counts,
        mode_counts,
        trips_per_day: per_day
            .into_iter()
            .map(|(date, trips)| DailyCount { date, trips })
            .collect(),
    };

    debug!(
        "[Stats] '{}': {} trips, {} coordinates, {:.2} km",
        collection.name, stats.total_trips, stats.total_coordinates, stats.total_distance_km
    );

    stats
}

// ============================================================================
// Trip Summary
// ============================================================================

/// Details of a single trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripSummary {
    pub identifier: Option<String>,
    pub mode: String,
    pub purpose: String,
    pub point_count: usize,
    pub distance_km: f64,
    pub start: Option<Coordinate>,
    pub end: Option<Coordinate>,
    /// Whole minutes from first to last coordinate
    pub duration_minutes: i64,
}

impl TripSummary {
    /// Duration as `"H hrs M mins"`.
    pub fn duration_label(&self) -> String {
        format!(
            "{} hrs {} mins",
            self.duration_minutes.div_euclid(60),
            self.duration_minutes.rem_euclid(60)
        )
    }
}

/// Summarize one trip.
pub fn summarize_trip(trip: &Trip) -> TripSummary {
    TripSummary {
        identifier: trip.identifier.clone(),
        mode: trip.mode_label().to_string(),
        purpose: trip.purpose_label().to_string(),
        point_count: trip.coordinates.len(),
        distance_km: trip.distance_km(),
        start: trip.start().cloned(),
        end: trip.end().cloned(),
        duration_minutes: trip.duration_minutes().floor() as i64,
    }
}

// ============================================================================
// Map Region
// ============================================================================

/// Configuration for [`compute_map_region`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Fraction added to each delta. Default: 0.02
    pub padding: f64,
    /// Delta used when all points share a latitude (or longitude). Default: 0.05
    pub fallback_delta: f64,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            padding: 0.02,
            fallback_delta: 0.05,
        }
    }
}

/// Visible region enclosing every coordinate of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapRegion {
    pub center: GpsPoint,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

/// Center and padded extent of all coordinates, `None` without coordinates.
pub fn compute_map_region(collection: &RouteCollection, config: &RegionConfig) -> Option<MapRegion> {
    let bounds = compute_bounds(&collection.all_points())?;

    let padded = |delta: f64| {
        let delta = delta * (1.0 + config.padding);
        if delta > 0.0 {
            delta
        } else {
            config.fallback_delta
        }
    };

    Some(MapRegion {
        center: bounds.center(),
        latitude_delta: padded(bounds.max_lat - bounds.min_lat),
        longitude_delta: padded(bounds.max_lng - bounds.min_lng),
    })
}
