//! # Cluster Builder
//!
//! Runs density clustering over three point sets of a route collection and
//! reduces each cluster to its geometry:
//!
//! - **all**: every coordinate of every trip, no size filter
//! - **starts**: first coordinate of each trip, clusters with fewer than
//!   `min_endpoint_cluster_size` members dropped
//! - **ends**: last coordinate of each trip, same filter as starts

use log::debug;
use serde::{Deserialize, Serialize};

use crate::density::dbscan;
use crate::error::{Result, TripInsightsError};
use crate::geo_utils::{centroid, covering_radius, is_within_cluster};
use crate::{GpsPoint, RouteCollection};

/// Configuration for cluster building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Density neighborhood radius in degrees (not kilometers).
    /// Default: 0.0005 (~55 m of latitude)
    pub epsilon_degrees: f64,

    /// Neighborhood size, self included, that makes a core point.
    /// Default: 8
    pub min_points: usize,

    /// Smallest start/end cluster that is kept.
    /// Default: 3 (clusters of 1 or 2 trip endpoints are dropped)
    pub min_endpoint_cluster_size: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            epsilon_degrees: 0.0005,
            min_points: 8,
            min_endpoint_cluster_size: 3,
        }
    }
}

impl ClusterConfig {
    /// Check the parameters before clustering.
    pub fn validate(&self) -> Result<()> {
        if !(self.epsilon_degrees.is_finite() && self.epsilon_degrees > 0.0) {
            return Err(TripInsightsError::ConfigError {
                message: format!(
                    "epsilon_degrees must be a positive number, got {}",
                    self.epsilon_degrees
                ),
            });
        }
        if self.min_points == 0 {
            return Err(TripInsightsError::ConfigError {
                message: "min_points must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Geometry of one cluster: centroid and covering radius.
///
/// Member points are not retained; `size` records how many there were.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub center: GpsPoint,
    /// Largest haversine distance from the center to a member, in kilometers
    pub radius_km: f64,
    /// Number of member points
    pub size: usize,
}

impl Cluster {
    /// Build cluster geometry from its members.
    ///
    /// # Errors
    /// `InvalidInput` for an empty member set.
    pub fn from_members(members: &[GpsPoint]) -> Result<Self> {
        let center = centroid(members)?;
        Ok(Self {
            center,
            radius_km: covering_radius(&center, members),
            size: members.len(),
        })
    }

    /// Approximate membership test, see [`is_within_cluster`].
    pub fn contains(&self, point: &GpsPoint) -> bool {
        is_within_cluster(&self.center, self.radius_km, point)
    }
}

/// The three cluster sets of a route collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterSets {
    pub all: Vec<Cluster>,
    pub starts: Vec<Cluster>,
    pub ends: Vec<Cluster>,
}

impl ClusterSets {
    pub fn total(&self) -> usize {
        self.all.len() + self.starts.len() + self.ends.len()
    }
}

/// Cluster a point set and reduce every cluster with at least `min_size` members to its geometry.
pub fn cluster_points(
    points: &[GpsPoint],
    config: &ClusterConfig,
    min_size: usize,
) -> Result<Vec<Cluster>> {
    let found = dbscan(points, config.epsilon_degrees, config.min_points)?;
    let total = found.len();

    let clusters = found
        .member_points(points)
        .iter()
        .filter(|members| members.len() >= min_size)
        .map(|members| Cluster::from_members(members))
        .collect::<Result<Vec<_>>>()?;

    if clusters.len() < total {
        debug!(
            "[Clusters] Dropped {} of {} clusters below {} members",
            total - clusters.len(),
            total,
            min_size
        );
    }
    Ok(clusters)
}

/// Build waypoint, start and end clusters for a route collection.
///
/// Collections without trips or coordinates give empty sets.
///
/// # Errors
/// `ConfigError` when the configuration is invalid.
pub fn build_clusters(collection: &RouteCollection, config: &ClusterConfig) -> Result<ClusterSets> {
    config.validate()?;

    let all_points = collection.all_points();
    let start_points = collection.start_points();
    let end_points = collection.end_points();
    let endpoint_min = config.min_endpoint_cluster_size;

    #[cfg(feature = "parallel")]
    let (all, (starts, ends)) = rayon::join(
        || cluster_points(&all_points, config, 1),
        || {
            rayon::join(
                || cluster_points(&start_points, config, endpoint_min),
                || cluster_points(&end_points, config, endpoint_min),
            )
        },
    );
    #[cfg(not(feature = "parallel"))]
    let (all, (starts, ends)) = (
        cluster_points(&all_points, config, 1),
        (
            cluster_points(&start_points, config, endpoint_min),
            cluster_points(&end_points, config, endpoint_min),
        ),
    );

    let sets = ClusterSets {
        all: all?,
        starts: starts?,
        ends: ends?,
    };

    debug!(
        "[Clusters] '{}': {} waypoint, {} start, {} end clusters from {} points",
        collection.name,
        sets.all.len(),
        sets.starts.len(),
        sets.ends.len(),
        all_points.len()
    );

    Ok(sets)
}
