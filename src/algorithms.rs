//! # Algorithm Toolbox
//!
//! Direct access to every trip-analysis algorithm, for callers that want a
//! single step without the [`crate::TripEngine`].
//!
//! ## Core Algorithms
//!
//! - **Density Clustering**: DBSCAN over an R-tree with a union-find merge
//! - **Cluster Building**: waypoint, start and end cluster sets
//! - **Route Statistics**: totals, date range, mode/purpose frequencies
//! - **Cluster Attribution**: visits, dwell time, most likely hour
//!
//! ## Geographic Utilities
//!
//! - **Haversine Distance**: Great-circle distance between GPS points
//! - **Centroid / Covering Radius**: Cluster geometry
//! - **Membership**: Degree-space cluster containment test
//! - **Bounds Computation**: Bounding box for point sets
//!
//! # Example
//!
//! ```rust
//! use trip_insights::algorithms::{centroid, covering_radius, dbscan, GpsPoint};
//!
//! let points: Vec<GpsPoint> = (0..10)
//!     .map(|i| GpsPoint::new(49.28 + i as f64 * 0.00001, -123.12))
//!     .collect();
//!
//! let found = dbscan(&points, 0.0005, 8).unwrap();
//! assert_eq!(found.len(), 1);
//!
//! let members = &found.member_points(&points)[0];
//! let center = centroid(members).unwrap();
//! println!("radius: {:.4} km", covering_radius(&center, members));
//! ```

// =============================================================================
// Core Types (re-exported from lib)
// =============================================================================

pub use crate::{Bounds, Coordinate, GpsPoint, RouteCollection, TravelMode, Trip};

// =============================================================================
// Geographic Utilities
// =============================================================================

pub use crate::geo_utils::{
    centroid, compute_bounds, covering_radius, haversine_distance, is_within_cluster,
    polyline_length, EARTH_RADIUS_KM, KM_PER_DEGREE,
};

// =============================================================================
// Clustering
// =============================================================================

pub use crate::density::{dbscan, DensityClusters};

pub use crate::clusters::{build_clusters, cluster_points, Cluster, ClusterConfig, ClusterSets};

pub use crate::union_find::UnionFind;

// =============================================================================
// Statistics & Attribution
// =============================================================================

pub use crate::stats::{
    compute_map_region, compute_route_statistics, summarize_trip, MapRegion, RegionConfig,
    RouteStatistics, TripSummary,
};

pub use crate::attribution::{attribute_cluster, attribute_clusters, ClusterAttribution, HourOfDay};

pub use crate::engine::analyze_collection;
