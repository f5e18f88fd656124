//! # Density Clustering Engine
//!
//! DBSCAN over latitude/longitude points, with epsilon in degrees.
//!
//! ## Algorithm
//!
//! 1. Count the neighborhood of every point through an R-tree: every point
//!    (itself included) at Euclidean degree distance strictly below epsilon.
//! 2. A point with at least `min_points` neighbors is a core point.
//! 3. Each core point is queried again and joined with its core neighbors
//!    through Union-Find; each connected component is one cluster.
//! 4. Each non-core point is queried again; with a core neighbor it is a
//!    border point and joins the cluster of its nearest core neighbor
//!    (lowest index on ties).
//! 5. Everything else is noise.
//!
//! Neighbor lists are never stored, so memory stays linear in the number of
//! points even when every point sees every other.
//!
//! Clusters are numbered by their lowest core index and members are listed in
//! ascending index order, so the partition depends only on the input order and
//! parameters.

use std::collections::HashMap;

use log::debug;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::Serialize;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Result, TripInsightsError};
use crate::union_find::UnionFind;
use crate::GpsPoint;

/// A GPS point with its input index for R-tree queries
#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    idx: usize,
    lat: f64,
    lng: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lng])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.lat - point[0];
        let dlng = self.lng - point[1];
        dlat * dlat + dlng * dlng
    }
}

/// Build R-tree from the finite points; non-finite points are left out and end up as noise.
fn build_rtree(points: &[GpsPoint]) -> RTree<IndexedPoint> {
    let indexed: Vec<IndexedPoint> = points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.latitude.is_finite() && p.longitude.is_finite())
        .map(|(i, p)| IndexedPoint {
            idx: i,
            lat: p.latitude,
            lng: p.longitude,
        })
        .collect();
    RTree::bulk_load(indexed)
}

/// Indices strictly within epsilon of `point`, in tree order.
fn region_query<'a>(
    tree: &'a RTree<IndexedPoint>,
    point: &GpsPoint,
    epsilon_sq: f64,
) -> impl Iterator<Item = usize> + 'a {
    let finite = point.latitude.is_finite() && point.longitude.is_finite();
    let query = [point.latitude, point.longitude];
    tree.locate_within_distance(query, if finite { epsilon_sq } else { -1.0 })
        .filter(move |candidate| finite && candidate.distance_2(&query) < epsilon_sq)
        .map(|candidate| candidate.idx)
}

#[inline]
fn squared_degree_distance(a: &GpsPoint, b: &GpsPoint) -> f64 {
    let dlat = a.latitude - b.latitude;
    let dlng = a.longitude - b.longitude;
    dlat * dlat + dlng * dlng
}

/// Result of a density clustering run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DensityClusters {
    /// Member indices per cluster, ascending
    pub clusters: Vec<Vec<usize>>,
    /// Indices belonging to no cluster, ascending
    pub noise: Vec<usize>,
}

impl DensityClusters {
    /// Number of clusters found.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Resolve member indices back to points.
    pub fn member_points(&self, points: &[GpsPoint]) -> Vec<Vec<GpsPoint>> {
        self.clusters
            .iter()
            .map(|members| members.iter().map(|&i| points[i]).collect())
            .collect()
    }
}

/// Partition `points` into density clusters and noise.
///
/// # Arguments
/// * `points` - Input points; their order fixes cluster numbering
/// * `epsilon` - Neighborhood radius in degrees
/// * `min_points` - Neighborhood size (self included) that makes a core point
///
/// # Errors
/// `InvalidInput` for a non-positive or non-finite epsilon, or `min_points == 0`.
///
/// # Example
/// ```
/// use trip_insights::{dbscan, GpsPoint};
///
/// let mut points: Vec<GpsPoint> = (0..10)
///     .map(|i| GpsPoint::new(49.28 + i as f64 * 0.00001, -123.12))
///     .collect();
/// points.push(GpsPoint::new(40.0, -70.0)); // far away
///
/// let result = dbscan(&points, 0.0005, 8).unwrap();
/// assert_eq!(result.len(), 1);
/// assert_eq!(result.clusters[0].len(), 10);
/// assert_eq!(result.noise, vec![10]);
/// ```
pub fn dbscan(points: &[GpsPoint], epsilon: f64, min_points: usize) -> Result<DensityClusters> {
    if !(epsilon.is_finite() && epsilon > 0.0) {
        return Err(TripInsightsError::InvalidInput {
            message: format!("epsilon must be a positive number, got {}", epsilon),
        });
    }
    if min_points == 0 {
        return Err(TripInsightsError::InvalidInput {
            message: "min_points must be at least 1".to_string(),
        });
    }
    if points.is_empty() {
        return Ok(DensityClusters::default());
    }

    let n = points.len();
    let tree = build_rtree(points);
    let epsilon_sq = epsilon * epsilon;

    #[cfg(feature = "parallel")]
    let neighbor_counts: Vec<usize> = points
        .par_iter()
        .map(|p| region_query(&tree, p, epsilon_sq).count())
        .collect();
    #[cfg(not(feature = "parallel"))]
    let neighbor_counts: Vec<usize> = points
        .iter()
        .map(|p| region_query(&tree, p, epsilon_sq).count())
        .collect();

    let is_core: Vec<bool> = neighbor_counts
        .iter()
        .map(|&count| count >= min_points)
        .collect();

    // Connect core points that see each other
    let mut uf = UnionFind::new(n);
    for i in (0..n).filter(|&i| is_core[i]) {
        for j in region_query(&tree, &points[i], epsilon_sq) {
            if j > i && is_core[j] {
                uf.union(i, j);
            }
        }
    }

    // Number components by their lowest core index
    let mut cluster_of: Vec<Option<usize>> = vec![None; n];
    let mut root_to_cluster: HashMap<usize, usize> = HashMap::new();
    for i in (0..n).filter(|&i| is_core[i]) {
        let root = uf.find(i);
        let next_id = root_to_cluster.len();
        let id = *root_to_cluster.entry(root).or_insert(next_id);
        cluster_of[i] = Some(id);
    }
    let cluster_count = root_to_cluster.len();

    // Border points join their nearest core neighbor's cluster
    let mut noise = Vec::new();
    for i in (0..n).filter(|&i| !is_core[i]) {
        let nearest_core = region_query(&tree, &points[i], epsilon_sq)
            .filter(|&j| is_core[j])
            .min_by(|&a, &b| {
                squared_degree_distance(&points[i], &points[a])
                    .total_cmp(&squared_degree_distance(&points[i], &points[b]))
                    .then(a.cmp(&b))
            });

        match nearest_core {
            Some(j) => cluster_of[i] = cluster_of[j],
            None => noise.push(i),
        }
    }

    let mut clusters: Vec<Vec<usize>> = vec![Vec::new(); cluster_count];
    for (i, assigned) in cluster_of.iter().enumerate() {
        if let Some(id) = assigned {
            clusters[*id].push(i);
        }
    }

    debug!(
        "[Density] {} points -> {} clusters, {} noise (eps={}, min_points={})",
        n,
        clusters.len(),
        noise.len(),
        epsilon,
        min_points
    );

    Ok(DensityClusters { clusters, noise })
}
