//! Shared fixtures: trips shaped like the documents the trip recorder writes.

#![allow(dead_code)]

use coachco2::{Timeseries, Trip};
use serde_json::{json, Value};

/// Route logging to the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct ModeProps {
    pub mode: &'static str,
    pub distance: f64,
    pub duration: f64,
    pub distances: [f64; 3],
    pub timestamps: [f64; 3],
    pub speeds: [f64; 3],
    pub start_date: &'static str,
    pub end_date: &'static str,
}

pub const BICYCLE: ModeProps = ModeProps {
    mode: "BICYCLING",
    distance: 2456.0,
    duration: 600.0,
    distances: [0.0, 201.98652472578271, 201.98549037826737],
    timestamps: [1638890689000.0, 1638890719000.0, 1638890749000.0],
    speeds: [0.0, 6.73288415752609, 6.732849679275579],
    start_date: "2021-12-07T16:24:49+01:00",
    end_date: "2021-12-07T16:39:16+01:00",
};

pub const WALKING: ModeProps = ModeProps {
    mode: "WALKING",
    distance: 563.0,
    duration: 540.0,
    distances: [0.0, 2.3338746642432437, 5.89018714479141],
    timestamps: [1638891571000.0, 1638891601000.0, 1638891631000.0],
    speeds: [0.0, 0.07779582214144146, 0.196339571493047],
    start_date: "2021-12-07T16:39:31+01:00",
    end_date: "2021-12-07T17:04:07+01:00",
};

pub const CAR: ModeProps = ModeProps {
    mode: "CAR",
    distance: 14789.0,
    duration: 1800.0,
    distances: [0.0, 43.094121726730805, 31.5918459191552],
    timestamps: [1638893074000.0, 1638893104000.0, 1638893134000.0],
    speeds: [0.0, 1.4364707242243602, 1.0530615306385067],
    start_date: "2021-12-07T17:04:34+01:00",
    end_date: "2021-12-07T17:06:26+01:00",
};

pub const PLANE: ModeProps = ModeProps {
    mode: "AIR_OR_HSR",
    distance: 504789.0,
    duration: 1800.0,
    distances: [0.0, 3.084870063085477, 376.624960316763],
    timestamps: [1638909778000.0, 1638909808000.0, 1638909838000.0],
    speeds: [0.0, 0.10282900210284923, 12.5541653438921],
    start_date: "2021-12-07T17:06:26+01:00",
    end_date: "2021-12-07T19:18:05+01:00",
};

pub const LINE: [[f64; 2]; 3] = [
    [2.31251, 48.7799432],
    [2.313591181324194, 48.78161416932299],
    [2.314672362648388, 48.783285138645994],
];

/// A place marker when `props` is `None`, a mode feature otherwise.
pub fn mock_feature(id: &str, props: Option<&ModeProps>) -> Value {
    match props {
        None => json!({
            "id": id,
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": LINE[0] },
            "properties": {},
        }),
        Some(p) => json!({
            "id": id,
            "type": "Feature",
            "geometry": { "type": "LineString", "coordinates": LINE },
            "properties": {
                "sensed_mode": format!("PredictedModeTypes.{}", p.mode),
                "distance": p.distance,
                "start_fmt_time": p.start_date,
                "end_fmt_time": p.end_date,
                "duration": p.duration,
                "timestamps": p.timestamps,
                "distances": p.distances,
                "speeds": p.speeds,
            },
        }),
    }
}

pub fn mock_feature_collection(id: &str, features: Vec<Value>) -> Value {
    json!({
        "id": id,
        "type": "FeatureCollection",
        "properties": {},
        "features": features,
    })
}

/// A trip between two named places.
pub fn mock_serie(id: &str, features: Vec<Value>, manual_purpose: Option<&str>) -> Trip {
    let value = json!({
        "id": id,
        "type": "FeatureCollection",
        "properties": {
            "start_place": {
                "$oid": "sectionId01",
                "data": { "properties": { "display_name": "GR9, Isère" } },
            },
            "end_place": {
                "$oid": "sectionId02",
                "data": { "properties": { "display_name": "Piste de la Combe Noire, Isère" } },
            },
            "manual_purpose": manual_purpose,
            "start_fmt_time": "2021-06-30T14:47:51.081201+02:00",
            "end_fmt_time": "2021-06-30T16:37:05.086000+02:00",
        },
        "features": features,
    });
    serde_json::from_value(value).expect("valid trip fixture")
}

/// Place markers followed by a bicycle, a walking and a car segment.
pub fn multi_modes_features() -> Vec<Value> {
    vec![
        mock_feature("featureId01", None),
        mock_feature("featureId02", None),
        mock_feature("featureId03", None),
        mock_feature("featureId04", None),
        mock_feature_collection("featureCollectionId01", vec![mock_feature("featureId05", Some(&BICYCLE))]),
        mock_feature_collection("featureCollectionId02", vec![mock_feature("featureId06", Some(&WALKING))]),
        mock_feature_collection("featureCollectionId03", vec![mock_feature("featureId07", Some(&CAR))]),
    ]
}

/// A trip with a single segment traveled with the mode of `props`.
pub fn single_mode_trip(props: &ModeProps) -> Trip {
    mock_serie(
        "serieId01",
        vec![mock_feature_collection("sectionId01", vec![mock_feature("featureId01", Some(props))])],
        None,
    )
}

/// A trip written from the recorder template: the inner feature of the
/// segment carries only `properties`, without `type`, id or geometry.
pub fn template_trip_json(props: &ModeProps) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "FeatureCollection",
            "features": [{
                "properties": {
                    "sensed_mode": format!("PredictedModeTypes.{}", props.mode),
                    "distance": props.distance,
                    "start_fmt_time": props.start_date,
                    "end_fmt_time": props.end_date,
                    "duration": props.duration,
                    "speeds": props.speeds,
                },
            }],
        }],
    })
}

pub fn make_bicycle_trip() -> Trip {
    single_mode_trip(&BICYCLE)
}

pub fn make_walking_trip() -> Trip {
    single_mode_trip(&WALKING)
}

pub fn make_car_trip() -> Trip {
    single_mode_trip(&CAR)
}

pub fn make_plane_trip() -> Trip {
    single_mode_trip(&PLANE)
}

pub fn mock_timeserie(id: &str, start_date: &str, series: Vec<Trip>) -> Timeseries {
    Timeseries {
        id: id.to_string(),
        start_date: Some(start_date.to_string()),
        series,
        ..Default::default()
    }
}
