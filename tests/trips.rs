//! Trip metrics over recorder-shaped documents.
//!
//! Run with: `cargo test --test trips`

mod common;

use coachco2::format::{format_segments, Locale};
use coachco2::{
    compute_aggregation, compute_and_format_calories_trip, compute_and_format_co2_trip,
    compute_and_format_co2_trip_by_mode, compute_co2, extract_segments, modes_sorted_by_distance,
    purpose, trip_bounds, Mode, Segment,
};
use common::*;

// ============================================================================
// Modes
// ============================================================================

#[test]
fn test_modes_sorted_by_distance() {
    init_logging();
    let trip = mock_serie("serieId01", multi_modes_features(), None);

    assert_eq!(
        modes_sorted_by_distance(&trip),
        vec![Mode::Car, Mode::Bicycling, Mode::Walking]
    );
}

// ============================================================================
// Calories and CO2
// ============================================================================

#[test]
fn test_calories() {
    assert_eq!(compute_and_format_calories_trip(&make_bicycle_trip()), "104 kcal");
    assert_eq!(compute_and_format_calories_trip(&make_walking_trip()), "23 kcal");
    assert_eq!(compute_and_format_calories_trip(&make_car_trip()), "0 kcal");
}

#[test]
fn test_co2() {
    assert_eq!(compute_and_format_co2_trip(&make_bicycle_trip()), "0 kg");
    assert_eq!(compute_and_format_co2_trip(&make_car_trip()), "2.84 kg");
}

#[test]
fn test_co2_by_mode() {
    let car = make_car_trip();
    assert_eq!(compute_and_format_co2_trip_by_mode(&car, Mode::Car), "2.84 kg");

    let plane = make_plane_trip();
    assert_eq!(compute_and_format_co2_trip_by_mode(&plane, Mode::Bicycling), "0 kg");
}

#[test]
fn test_co2_by_mode_sums_to_total() {
    let trip = mock_serie("serieId01", multi_modes_features(), None);
    let by_mode: f64 = Mode::ALL
        .iter()
        .map(|&m| coachco2::compute_co2_by_mode(&trip, m))
        .sum();
    assert!((by_mode - compute_co2(&trip)).abs() < 1e-9);
}

#[test]
fn test_unknown_distance_counts_as_zero() {
    let trip = mock_serie(
        "serieId01",
        vec![mock_feature_collection(
            "sectionId01",
            vec![serde_json::json!({
                "type": "Feature",
                "properties": { "sensed_mode": "PredictedModeTypes.CAR", "distance": "" },
            })],
        )],
        None,
    );
    assert_eq!(extract_segments(&trip).len(), 1);
    assert_eq!(compute_and_format_co2_trip(&trip), "0 kg");
}

// ============================================================================
// Purpose
// ============================================================================

#[test]
fn test_purpose() {
    let trip = mock_serie("serieId01", multi_modes_features(), Some("PICK_DROP"));
    assert_eq!(purpose(&trip).as_deref(), Some("PICK_DROP"));

    let trip = mock_serie("serieId01", multi_modes_features(), None);
    assert_eq!(purpose(&trip), None);
}

// ============================================================================
// Segments
// ============================================================================

#[test]
fn test_segments_from_trip() {
    let trip = mock_serie("serieId01", multi_modes_features(), None);
    let segments = extract_segments(&trip);
    assert_eq!(segments.len(), 3);

    let first: &Segment = &segments[0];
    assert_eq!(first.id.as_deref(), Some("featureCollectionId01"));
    assert_eq!(first.mode, Mode::Bicycling);
    assert_eq!(first.distance, 2456.0);
    assert_eq!(first.duration, 600.0);
    assert_eq!(first.distances.len(), 3);
    assert_eq!(first.timestamps[0], 1638890689000.0);
    assert_eq!(first.speeds.len(), 3);
    assert_eq!(first.coordinates.len(), 3);
    assert!((first.average_speed - 2456.0 / 600.0).abs() < 1e-9);
    assert_eq!(
        first.start_date.map(|d| d.to_rfc3339()),
        Some("2021-12-07T16:24:49+01:00".to_string())
    );
    assert!(first.end_date.is_some());
}

#[test]
fn test_segment_json_shape() {
    let trip = make_bicycle_trip();
    let value = serde_json::to_value(&extract_segments(&trip)[0]).unwrap();
    for key in [
        "averageSpeed",
        "coordinates",
        "distance",
        "distances",
        "duration",
        "endDate",
        "id",
        "mode",
        "speeds",
        "startDate",
        "timestamps",
    ] {
        assert!(value.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(value["mode"], "BICYCLING");
}

#[test]
fn test_extraction_is_idempotent() {
    let trip = mock_serie("serieId01", multi_modes_features(), None);
    assert_eq!(extract_segments(&trip), extract_segments(&trip));
}

#[test]
fn test_formatted_segments() {
    let formatted = format_segments(&make_bicycle_trip(), Locale::En);
    assert_eq!(formatted.len(), 1);
    assert_eq!(formatted[0].distance, "2 km");
    assert_eq!(formatted[0].duration, "10 min");
    assert_eq!(formatted[0].average_speed, "15 km/h");
    assert_eq!(formatted[0].mean_speed, "16 km/h");
    assert_eq!(formatted[0].calories, "104 kcal");
    assert_eq!(formatted[0].start_time.as_deref(), Some("16:24"));

    let formatted = format_segments(&make_car_trip(), Locale::Fr);
    assert_eq!(formatted[0].co2, "2,84 kg");
}

#[test]
fn test_trip_bounds() {
    let bounds = trip_bounds(&make_car_trip()).unwrap();
    assert_eq!(bounds.min_lng, 2.31251);
    assert_eq!(bounds.max_lat, 48.783285138645994);
}

// ============================================================================
// Aggregation
// ============================================================================

#[test]
fn test_aggregation() {
    let trip = mock_serie("serieId01", multi_modes_features(), Some("COMMUTE"));
    let ts = mock_timeserie("timeserieId01", "2021-12-07T16:24:49+01:00", vec![trip]);

    let aggregation = compute_aggregation(&ts);
    assert_eq!(aggregation.total_distance, 2456.0 + 563.0 + 14789.0);
    assert_eq!(aggregation.total_duration, 600.0 + 540.0 + 1800.0);
    assert!((aggregation.total_co2 - 2.839488).abs() < 1e-9);
    assert_eq!(
        aggregation.modes,
        vec![Mode::Car, Mode::Bicycling, Mode::Walking]
    );
    assert_eq!(aggregation.purpose.as_deref(), Some("COMMUTE"));
    assert_eq!(aggregation.start_place_display_name.as_deref(), Some("GR9, Isère"));
    assert_eq!(
        aggregation.end_place_display_name.as_deref(),
        Some("Piste de la Combe Noire, Isère")
    );

    let json = serde_json::to_value(&aggregation).unwrap();
    assert_eq!(json["totalCO2"], aggregation.total_co2);
    assert_eq!(json["modes"][0], "CAR");
}

#[test]
fn test_timeseries_from_json() {
    let json = r#"[{
        "_id": "timeserieId01",
        "_type": "io.cozy.timeseries.geojson",
        "cozyMetadata": { "sourceAccount": "accountId" },
        "startDate": "2021-12-07T16:24:49+01:00",
        "series": []
    }]"#;
    let list = coachco2::Timeseries::list_from_json(json).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, "timeserieId01");
    assert_eq!(list[0].cozy_metadata.source_account.as_deref(), Some("accountId"));
}

// ============================================================================
// Template-shaped documents
// ============================================================================

#[test]
fn test_template_trip_without_feature_type() {
    let json = template_trip_json(&BICYCLE).to_string();
    let trip = coachco2::Trip::from_json(&json).unwrap();

    assert_eq!(compute_and_format_calories_trip(&trip), "104 kcal");
    assert_eq!(modes_sorted_by_distance(&trip), vec![Mode::Bicycling]);

    let formatted = format_segments(&trip, Locale::En);
    assert_eq!(formatted[0].average_speed, "15 km/h");
    assert_eq!(formatted[0].mean_speed, "16 km/h");
}

#[test]
fn test_one_odd_trip_does_not_sink_the_list() {
    let json = serde_json::json!([
        { "_id": "a", "series": [template_trip_json(&CAR)] },
        { "_id": "b", "series": [{ "features": [{ "type": "FeatureCollection" }] }] },
    ])
    .to_string();

    let list = coachco2::Timeseries::list_from_json(&json).unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(compute_and_format_co2_trip(&list[0].series[0]), "2.84 kg");

    let empty_segment = extract_segments(&list[1].series[0]);
    assert_eq!(empty_segment.len(), 1);
    assert_eq!(empty_segment[0].mode, Mode::Unknown);
}
