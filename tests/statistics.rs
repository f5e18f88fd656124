//! Tests for route statistics

use trip_insights::geo_utils::haversine_distance;
use trip_insights::{
    compute_route_statistics, loader, Coordinate, DateRange, RouteCollection, TravelMode, Trip,
    NOT_SELECTED,
};

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

fn coord(lat: f64, lng: f64, ts: &str) -> Coordinate {
    Coordinate::parse(lat, lng, ts).unwrap()
}

#[test]
fn test_empty_collection_resolves_to_sentinels() {
    let stats = compute_route_statistics(&RouteCollection::new("empty", vec![]));
    assert_eq!(stats.total_trips, 0);
    assert_eq!(stats.total_distance_km, 0.0);
    assert_eq!(stats.total_coordinates, 0);
    assert!(stats.date_range.is_no_data());
    assert_eq!(stats.most_common_purpose, None);
    assert!(stats.purpose_counts.is_empty());
}

#[test]
fn test_single_trip_scenario() {
    let json = r#"{"route": [{"coordinates": [
        [49.28, -123.12, "2024-01-01T08:00:00Z"],
        [49.2805, -123.1205, "2024-01-01T08:10:00Z"]
    ]}]}"#;
    let loaded = loader::load_from_str(json).unwrap();
    let collection = loaded.document.first().unwrap();
    let trip = &collection.trips[0];

    let stats = compute_route_statistics(collection);
    let expected = haversine_distance(&trip.coordinates[0].point(), &trip.coordinates[1].point());

    assert_eq!(stats.total_trips, 1);
    assert_eq!(stats.total_coordinates, 2);
    assert!(approx_eq(stats.total_distance_km, expected, 1e-12));
    assert_eq!(stats.most_common_mode.as_deref(), Some(NOT_SELECTED));
    assert_eq!(stats.most_common_purpose.as_deref(), Some(NOT_SELECTED));
    assert_eq!(stats.date_range.duration_minutes(), Some(10.0));
    assert_eq!(stats.date_range.label(), "2024-01-01 - 2024-01-01");
}

#[test]
fn test_distance_sums_within_trips_only() {
    let collection = RouteCollection::new(
        "two",
        vec![
            Trip::new(vec![
                coord(0.0, 0.0, "2024-01-01T08:00:00Z"),
                coord(1.0, 0.0, "2024-01-01T09:00:00Z"),
            ]),
            // Far from the first trip's end; no distance joins the two trips
            Trip::new(vec![coord(40.0, 40.0, "2024-01-01T10:00:00Z")]),
        ],
    );
    let stats = compute_route_statistics(&collection);
    assert!(approx_eq(stats.total_distance_km, 111.195, 0.001));
}

#[test]
fn test_mode_and_purpose_frequencies() {
    let trips = vec![
        Trip::new(vec![]).with_mode(TravelMode::Walk).with_purpose("Work"),
        Trip::new(vec![]).with_mode(TravelMode::Bike).with_purpose("Leisure"),
        Trip::new(vec![]).with_mode(TravelMode::Bike),
        Trip::new(vec![]).with_mode(TravelMode::Walk).with_purpose("Leisure"),
    ];
    let stats = compute_route_statistics(&RouteCollection::new("freq", trips));

    assert_eq!(stats.mode_counts.get("Walk"), 2);
    assert_eq!(stats.mode_counts.get("Bike"), 2);
    // Walk was inserted first
    assert_eq!(stats.most_common_mode.as_deref(), Some("Walk"));
    assert_eq!(stats.most_common_purpose.as_deref(), Some("Leisure"));
    assert_eq!(stats.purpose_counts.get(NOT_SELECTED), 1);

    let labels: Vec<&str> = stats
        .purpose_counts
        .entries()
        .iter()
        .map(|e| e.label.as_str())
        .collect();
    assert_eq!(labels, vec!["Work", "Leisure", NOT_SELECTED]);
}

#[test]
fn test_empty_trips_counted_but_dateless() {
    let collection = RouteCollection::new("hollow", vec![Trip::new(vec![]), Trip::new(vec![])]);
    let stats = compute_route_statistics(&collection);
    assert_eq!(stats.total_trips, 2);
    assert_eq!(stats.date_range, DateRange::NoData);
    assert!(stats.trips_per_day.is_empty());
}

#[test]
fn test_statistics_serialize() {
    let collection = RouteCollection::new(
        "json",
        vec![Trip::new(vec![coord(0.0, 0.0, "2024-01-01T08:00:00Z")])],
    );
    let json = serde_json::to_value(compute_route_statistics(&collection)).unwrap();
    assert_eq!(json["total_trips"], 1);
    assert_eq!(json["date_range"]["state"], "span");
    assert_eq!(json["trips_per_day"][0]["date"], "2024-01-01");
    assert_eq!(json["mode_counts"][0]["label"], NOT_SELECTED);
}
