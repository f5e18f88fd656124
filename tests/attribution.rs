//! Tests for cluster attribution

use trip_insights::{
    attribute_cluster, attribute_clusters, build_clusters, Cluster, ClusterConfig, Coordinate,
    GpsPoint, HourOfDay, RouteCollection, Trip,
};

fn coord(lat: f64, lng: f64, ts: &str) -> Coordinate {
    Coordinate::parse(lat, lng, ts).unwrap()
}

fn cafe() -> Cluster {
    Cluster {
        center: GpsPoint::new(49.2827, -123.1207),
        radius_km: 0.05,
        size: 12,
    }
}

#[test]
fn test_six_minute_dwell_with_two_visits() {
    let collection = RouteCollection::new(
        "cafe",
        vec![
            Trip::new(vec![
                coord(49.2700, -123.1300, "2024-02-01T07:50:00Z"),
                coord(49.2827, -123.1207, "2024-02-01T08:00:00Z"),
                coord(49.2828, -123.1207, "2024-02-01T08:06:00Z"),
                coord(49.2900, -123.1100, "2024-02-01T08:20:00Z"),
            ]),
            Trip::new(vec![
                coord(49.2827, -123.1208, "2024-02-02T12:30:00Z"),
                coord(49.3000, -123.1000, "2024-02-02T12:45:00Z"),
            ]),
        ],
    );
    let result = attribute_cluster(&cafe(), &collection);
    assert_eq!(result.visit_count, 2);
    assert!((result.average_duration_minutes - 6.0).abs() < 1e-9);
    assert_eq!(result.most_likely_hour, HourOfDay::Hour(8));
    assert_eq!(result.most_likely_hour.label(), "8:00 - 9:00");
}

#[test]
fn test_visit_count_is_monotonic() {
    let mut trips = Vec::new();
    let mut previous = 0;
    for day in 1..=5 {
        trips.push(Trip::new(vec![coord(
            49.2827,
            -123.1207,
            &format!("2024-02-{:02}T09:00:00Z", day),
        )]));
        // A trip that never comes near the cluster
        trips.push(Trip::new(vec![coord(
            48.0,
            -122.0,
            &format!("2024-02-{:02}T10:00:00Z", day),
        )]));
        let collection = RouteCollection::new("grow", trips.clone());
        let visits = attribute_cluster(&cafe(), &collection).visit_count;
        assert!(visits >= previous);
        assert_eq!(visits, day);
        previous = visits;
    }
}

#[test]
fn test_dwell_uses_first_and_last_inside_points() {
    // Leaves and comes back: dwell spans the whole stay
    let collection = RouteCollection::new(
        "loop",
        vec![Trip::new(vec![
            coord(49.2827, -123.1207, "2024-02-01T08:00:00Z"),
            coord(49.2900, -123.1207, "2024-02-01T08:10:00Z"),
            coord(49.2827, -123.1207, "2024-02-01T08:30:00Z"),
        ])],
    );
    let result = attribute_cluster(&cafe(), &collection);
    assert_eq!(result.visit_count, 1);
    assert!((result.average_duration_minutes - 30.0).abs() < 1e-9);
}

#[test]
fn test_unvisited_cluster() {
    let collection = RouteCollection::new(
        "elsewhere",
        vec![Trip::new(vec![coord(0.0, 0.0, "2024-02-01T08:00:00Z")])],
    );
    let result = attribute_cluster(&cafe(), &collection);
    assert_eq!(result.visit_count, 0);
    assert_eq!(result.average_duration_minutes, 0.0);
    assert_eq!(result.most_likely_hour, HourOfDay::Unavailable);
    assert_eq!(result.most_likely_hour.label(), "N/A");
}

#[test]
fn test_attribution_of_built_clusters() {
    let coords = (0..10)
        .map(|i| {
            coord(
                49.2827 + i as f64 * 0.00001,
                -123.1207,
                &format!("2024-02-01T14:{:02}:00Z", i * 2),
            )
        })
        .collect();
    let collection = RouteCollection::new("stay", vec![Trip::new(coords)]);
    let sets = build_clusters(&collection, &ClusterConfig::default()).unwrap();
    let attributions = attribute_clusters(&sets.all, &collection);

    assert_eq!(attributions.len(), 1);
    assert_eq!(attributions[0].visit_count, 1);
    assert_eq!(attributions[0].most_likely_hour, HourOfDay::Hour(14));
    assert!((attributions[0].average_duration_minutes - 18.0).abs() < 1e-9);
}
