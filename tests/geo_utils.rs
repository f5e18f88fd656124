//! Tests for geo_utils module

use trip_insights::geo_utils::*;
use trip_insights::GpsPoint;

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

fn sample_points() -> Vec<GpsPoint> {
    vec![
        GpsPoint::new(49.2800, -123.1200),
        GpsPoint::new(49.2810, -123.1185),
        GpsPoint::new(49.2795, -123.1230),
        GpsPoint::new(49.2830, -123.1210),
    ]
}

#[test]
fn test_haversine_same_point_is_zero() {
    for p in sample_points() {
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }
}

#[test]
fn test_haversine_symmetric() {
    let points = sample_points();
    for a in &points {
        for b in &points {
            assert!(approx_eq(
                haversine_distance(a, b),
                haversine_distance(b, a),
                1e-12
            ));
        }
    }
}

#[test]
fn test_haversine_one_degree_latitude() {
    let a = GpsPoint::new(0.0, 0.0);
    let b = GpsPoint::new(1.0, 0.0);
    // 6371 km * pi / 180
    assert!(approx_eq(haversine_distance(&a, &b), 111.195, 0.001));
}

#[test]
fn test_covering_radius_is_max_distance_from_centroid() {
    let points = sample_points();
    let center = centroid(&points).unwrap();
    let radius = covering_radius(&center, &points);

    let expected = points
        .iter()
        .map(|p| haversine_distance(&center, p))
        .fold(0.0_f64, f64::max);
    assert_eq!(radius, expected);
    assert!(radius >= 0.0);
}

#[test]
fn test_centroid_is_component_mean() {
    let center = centroid(&sample_points()).unwrap();
    assert!(approx_eq(center.latitude, 49.280875, 1e-9));
    assert!(approx_eq(center.longitude, -123.120625, 1e-9));
}

#[test]
fn test_centroid_empty_fails() {
    assert!(centroid(&[]).is_err());
}

#[test]
fn test_singleton_radius_is_zero() {
    let p = GpsPoint::new(49.28, -123.12);
    let center = centroid(&[p]).unwrap();
    assert_eq!(covering_radius(&center, &[p]), 0.0);
}

#[test]
fn test_is_within_cluster_uses_degree_space() {
    let center = GpsPoint::new(49.28, -123.12);
    // 0.111 km -> 0.001 degrees
    assert!(is_within_cluster(&center, 0.111, &GpsPoint::new(49.2809, -123.12)));
    assert!(!is_within_cluster(&center, 0.111, &GpsPoint::new(49.2811, -123.12)));
    // Same rule east/west even though a longitude degree is shorter here
    assert!(is_within_cluster(&center, 0.111, &GpsPoint::new(49.28, -123.1191)));
}

#[test]
fn test_polyline_length_and_bounds() {
    let track = vec![
        GpsPoint::new(0.0, 0.0),
        GpsPoint::new(1.0, 0.0),
        GpsPoint::new(1.0, 1.0),
    ];
    let length = polyline_length(&track);
    assert!(approx_eq(length, 111.195 * 2.0, 0.05));

    let bounds = compute_bounds(&track).unwrap();
    assert_eq!(bounds.min_lat, 0.0);
    assert_eq!(bounds.max_lat, 1.0);
    assert_eq!(bounds.max_lng, 1.0);
    assert!(compute_bounds(&[]).is_none());
}
