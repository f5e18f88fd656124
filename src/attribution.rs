//! # Cluster Attribution
//!
//! Enriches cluster geometry with behavior taken from the trips that pass through it:
//! how many trips visit, how long they stay, and at which hour they usually arrive.
//!
//! Membership uses [`Cluster::contains`], the degree-space approximation of
//! [`crate::geo_utils::is_within_cluster`].

use chrono::Timelike;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::clusters::Cluster;
use crate::error::{Result, TripInsightsError};
use crate::{minutes_between, Coordinate, RouteCollection, Timestamp};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Hour of day (0-23) at which trips usually enter a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Option<u32>", into = "Option<u32>")]
pub enum HourOfDay {
    /// No trip touches the cluster
    Unavailable,
    Hour(u32),
}

impl HourOfDay {
    pub fn hour(&self) -> Option<u32> {
        match self {
            HourOfDay::Unavailable => None,
            HourOfDay::Hour(h) => Some(*h),
        }
    }

    /// `"h:00 - (h+1):00"`, or `"N/A"` when unavailable.
    pub fn label(&self) -> String {
        match self {
            HourOfDay::Unavailable => "N/A".to_string(),
            HourOfDay::Hour(h) => format!("{}:00 - {}:00", h, h + 1),
        }
    }
}

impl TryFrom<Option<u32>> for HourOfDay {
    type Error = TripInsightsError;

    fn try_from(hour: Option<u32>) -> Result<Self> {
        match hour {
            None => Ok(HourOfDay::Unavailable),
            Some(h) if h < 24 => Ok(HourOfDay::Hour(h)),
            Some(h) => Err(TripInsightsError::InvalidInput {
                message: format!("hour of day must be 0-23, got {}", h),
            }),
        }
    }
}

impl From<HourOfDay> for Option<u32> {
    fn from(hour: HourOfDay) -> Self {
        hour.hour()
    }
}

/// Behavioral statistics of one cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterAttribution {
    /// Trips with at least one coordinate inside the cluster
    pub visit_count: usize,
    /// Mean dwell time over trips with two or more coordinates inside, 0 if none
    pub average_duration_minutes: f64,
    /// Most frequent entry hour; ties go to the hour seen first
    pub most_likely_hour: HourOfDay,
}

/// Entry hours in order of first occurrence with their counts.
#[derive(Default)]
struct HourCounts(Vec<(u32, usize)>);

impl HourCounts {
    fn add(&mut self, hour: u32) {
        match self.0.iter_mut().find(|(h, _)| *h == hour) {
            Some((_, count)) => *count += 1,
            None => self.0.push((hour, 1)),
        }
    }

    fn most_common(&self) -> HourOfDay {
        let mut best: Option<(u32, usize)> = None;
        for &(hour, count) in &self.0 {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((hour, count));
            }
        }
        best.map_or(HourOfDay::Unavailable, |(h, _)| HourOfDay::Hour(h))
    }
}

/// Attribute one cluster against every trip of a collection.
///
/// # Example
/// ```
/// use trip_insights::{attribute_cluster, Cluster, GpsPoint, HourOfDay, RouteCollection};
///
/// let cluster = Cluster { center: GpsPoint::new(49.28, -123.12), radius_km: 0.1, size: 1 };
/// let attribution = attribute_cluster(&cluster, &RouteCollection::default());
/// assert_eq!(attribution.visit_count, 0);
/// assert_eq!(attribution.most_likely_hour, HourOfDay::Unavailable);
/// ```
pub fn attribute_cluster(cluster: &Cluster, collection: &RouteCollection) -> ClusterAttribution {
    let mut visit_count = 0;
    let mut dwell_total = 0.0;
    let mut dwell_trips = 0usize;
    let mut hours = HourCounts::default();

    for trip in &collection.trips {
        let inside: Vec<&Coordinate> = trip
            .coordinates
            .iter()
            .filter(|c| cluster.contains(&c.point()))
            .collect();
        if inside.is_empty() {
            continue;
        }
        visit_count += 1;

        // Untimed coordinates count as a visit but carry no hour or dwell
        let times: Vec<Timestamp> = inside.iter().filter_map(|c| c.timestamp).collect();
        if let Some(first) = times.first() {
            hours.add(first.hour());
        }
        if let (Some(first), Some(last)) = (times.first(), times.last()) {
            if times.len() >= 2 {
                dwell_total += minutes_between(first, last);
                dwell_trips += 1;
            }
        }
    }

    ClusterAttribution {
        visit_count,
        average_duration_minutes: if dwell_trips > 0 {
            dwell_total / dwell_trips as f64
        } else {
            0.0
        },
        most_likely_hour: hours.most_common(),
    }
}

/// Attribute every cluster of a set, in cluster order.
pub fn attribute_clusters(
    clusters: &[Cluster],
    collection: &RouteCollection,
) -> Vec<ClusterAttribution> {
    #[cfg(feature = "parallel")]
    let attributions: Vec<ClusterAttribution> = clusters
        .par_iter()
        .map(|c| attribute_cluster(c, collection))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let attributions: Vec<ClusterAttribution> = clusters
        .iter()
        .map(|c| attribute_cluster(c, collection))
        .collect();

    debug!(
        "[Attribution] '{}': attributed {} clusters over {} trips",
        collection.name,
        attributions.len(),
        collection.trips.len()
    );
    attributions
}
