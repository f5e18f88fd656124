//! # Geographic Utilities
//!
//! Geometry used to size clusters and test cluster membership.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two points, in kilometers |
//! | [`centroid`] | Arithmetic mean of a non-empty point set |
//! | [`covering_radius`] | Largest haversine distance from a center to any point |
//! | [`is_within_cluster`] | Planar-degree membership test against a cluster |
//! | [`polyline_length`] | Total length of a track in kilometers |
//! | [`compute_bounds`] | Bounding box of a point set |
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! Distances assume a spherical Earth of radius 6371 km.
//!
//! Reference: [Haversine formula (Wikipedia)](https://en.wikipedia.org/wiki/Haversine_formula)
//!
//! ### Membership approximation
//!
//! [`is_within_cluster`] compares the Euclidean distance in degree space with
//! `radius_km / 111`. It is cheaper than haversine and does not
//! agree with [`covering_radius`]: longitude degrees shrink with latitude, so
//! at 49°N the test accepts points up to ~1.5x the radius east/west of the
//! center. Attribution results depend on this exact test.

use geo::{BoundingRect, Centroid, MultiPoint, Point};

use crate::error::{OptionExt, Result};
use crate::{Bounds, GpsPoint};

/// Mean Earth radius used by [`haversine_distance`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometers per degree used by [`is_within_cluster`].
pub const KM_PER_DEGREE: f64 = 111.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance between two points in kilometers.
///
/// # Example
///
/// ```rust
/// use trip_insights::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343.5).abs() < 1.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let d_lat = (p2.latitude - p1.latitude).to_radians();
    let d_lng = (p2.longitude - p1.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Total length of a track in kilometers. Empty or single-point tracks return 0.0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Cluster Geometry
// =============================================================================

/// Centroid of a point set: mean latitude and mean longitude, independently.
///
/// # Errors
///
/// `InvalidInput` when `points` is empty.
///
/// # Example
///
/// ```rust
/// use trip_insights::{GpsPoint, geo_utils};
///
/// let points = vec![GpsPoint::new(49.0, -123.0), GpsPoint::new(49.2, -123.2)];
/// let center = geo_utils::centroid(&points).unwrap();
/// assert!((center.latitude - 49.1).abs() < 1e-9);
/// assert!(geo_utils::centroid(&[]).is_err());
/// ```
pub fn centroid(points: &[GpsPoint]) -> Result<GpsPoint> {
    let multi: MultiPoint<f64> = points
        .iter()
        .map(|p| Point::new(p.longitude, p.latitude))
        .collect();

    multi
        .centroid()
        .map(|c| GpsPoint::new(c.y(), c.x()))
        .ok_or_invalid_input("centroid requires at least one point")
}

/// Largest haversine distance (km) from `center` to any point; 0 for a singleton or empty set.
pub fn covering_radius(center: &GpsPoint, points: &[GpsPoint]) -> f64 {
    points
        .iter()
        .map(|p| haversine_distance(center, p))
        .fold(0.0, f64::max)
}

/// Approximate membership test: degree-space Euclidean distance `<= radius_km / 111`.
#[inline]
pub fn is_within_cluster(center: &GpsPoint, radius_km: f64, point: &GpsPoint) -> bool {
    let d_lat = center.latitude - point.latitude;
    let d_lng = center.longitude - point.longitude;
    (d_lat * d_lat + d_lng * d_lng).sqrt() <= radius_km / KM_PER_DEGREE
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Bounding box of a point set, `None` when empty.
pub fn compute_bounds(points: &[GpsPoint]) -> Option<Bounds> {
    let multi: MultiPoint<f64> = points
        .iter()
        .map(|p| Point::new(p.longitude, p.latitude))
        .collect();

    multi.bounding_rect().map(|rect| Bounds {
        min_lat: rect.min().y,
        max_lat: rect.max().y,
        min_lng: rect.min().x,
        max_lng: rect.max().x,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_haversine_distance_same_point() {
        let p = GpsPoint::new(49.2827, -123.1207);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_haversine_distance_one_degree_latitude() {
        let a = GpsPoint::new(0.0, 0.0);
        let b = GpsPoint::new(1.0, 0.0);
        // 6371 * pi / 180
        assert!(approx_eq(haversine_distance(&a, &b), 111.195, 0.001));
    }

    #[test]
    fn test_haversine_symmetric() {
        let a = GpsPoint::new(49.28, -123.12);
        let b = GpsPoint::new(49.26, -123.25);
        assert!(approx_eq(
            haversine_distance(&a, &b),
            haversine_distance(&b, &a),
            1e-12
        ));
    }

    #[test]
    fn test_polyline_length_short_tracks() {
        assert_eq!(polyline_length(&[]), 0.0);
        assert_eq!(polyline_length(&[GpsPoint::new(49.28, -123.12)]), 0.0);
    }

    #[test]
    fn test_centroid_mean() {
        let points = vec![
            GpsPoint::new(49.0, -123.0),
            GpsPoint::new(49.2, -123.4),
            GpsPoint::new(49.4, -123.2),
        ];
        let center = centroid(&points).unwrap();
        assert!(approx_eq(center.latitude, 49.2, 1e-9));
        assert!(approx_eq(center.longitude, -123.2, 1e-9));
    }

    #[test]
    fn test_centroid_empty_is_invalid_input() {
        assert!(matches!(
            centroid(&[]),
            Err(crate::TripInsightsError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_covering_radius_singleton() {
        let p = GpsPoint::new(49.28, -123.12);
        assert_eq!(covering_radius(&p, &[p]), 0.0);
    }

    #[test]
    fn test_covering_radius_is_max_distance() {
        let center = GpsPoint::new(0.0, 0.0);
        let points = vec![GpsPoint::new(0.5, 0.0), GpsPoint::new(1.0, 0.0)];
        let radius = covering_radius(&center, &points);
        assert!(approx_eq(radius, haversine_distance(&center, &points[1]), 1e-12));
    }

    #[test]
    fn test_is_within_cluster_uses_111_km_per_degree() {
        let center = GpsPoint::new(49.0, -123.0);
        // 1.11 km radius -> 0.01 degrees
        assert!(is_within_cluster(&center, 1.11, &GpsPoint::new(49.0099, -123.0)));
        assert!(is_within_cluster(&center, 1.11, &GpsPoint::new(49.0, -122.9901)));
        assert!(!is_within_cluster(&center, 1.11, &GpsPoint::new(49.0101, -123.0)));
    }

    #[test]
    fn test_is_within_cluster_zero_radius_matches_center_only() {
        let center = GpsPoint::new(49.0, -123.0);
        assert!(is_within_cluster(&center, 0.0, &center));
        assert!(!is_within_cluster(&center, 0.0, &GpsPoint::new(49.0, -123.000001)));
    }

    #[test]
    fn test_compute_bounds() {
        let track = vec![
            GpsPoint::new(51.50, -0.13),
            GpsPoint::new(51.51, -0.12),
            GpsPoint::new(51.505, -0.125),
        ];
        let bounds = compute_bounds(&track).unwrap();
        assert_eq!(bounds.min_lat, 51.50);
        assert_eq!(bounds.max_lat, 51.51);
        assert_eq!(bounds.min_lng, -0.13);
        assert_eq!(bounds.max_lng, -0.12);
        assert!(compute_bounds(&[]).is_none());
    }
}
