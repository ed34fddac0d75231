//! Trip and timeseries documents as stored in `io.cozy.timeseries.geojson`.
//!
//! A timeseries document holds a `series` of trips. Each trip is a GeoJSON
//! feature collection whose `features` mix bare features (start/end place
//! markers) with nested feature collections, one per mode segment.
//!
//! Numeric fields written by the trip recorder are not always numbers: an
//! unknown distance is stored as `""`. Those fields are read leniently and
//! anything that is not a finite number becomes `0.0`.

use log::{debug, warn};
use serde::{ser, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::Result;
use crate::trips::Aggregation;
use crate::GpsPoint;

// ============================================================================
// Lenient field readers
// ============================================================================

fn number_or_zero(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(number_or_zero).unwrap_or(0.0))
}

fn lenient_f64_vec<'de, D>(deserializer: D) -> std::result::Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(value
        .unwrap_or_default()
        .iter()
        .map(number_or_zero)
        .collect())
}

// ============================================================================
// Trip
// ============================================================================

/// A recorded journey: trip-level metadata plus an ordered list of nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: TripProperties,
    #[serde(default)]
    pub features: Vec<TripNode>,
}

impl Trip {
    /// Parse a single trip from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn start_place_display_name(&self) -> Option<&str> {
        self.properties.start_place.display_name()
    }

    pub fn end_place_display_name(&self) -> Option<&str> {
        self.properties.end_place.display_name()
    }
}

/// Trip-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripProperties {
    #[serde(default)]
    pub start_place: Place,
    #[serde(default)]
    pub end_place: Place,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_fmt_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_fmt_time: Option<String>,
    /// Purpose chosen by the user (e.g. `COMMUTE`, `PICK_DROP`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_purpose: Option<String>,
}

/// Reference to a start or end place, with its resolved display name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(rename = "$oid", default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PlaceData>,
}

impl Place {
    pub fn display_name(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.properties.display_name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceData {
    #[serde(default)]
    pub properties: PlaceProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// A node of a trip: either a single feature or a nested collection.
///
/// A node without a `type` is read as a collection when it carries a
/// `features` array and as a feature otherwise. Nodes of any other type, or
/// that do not fit their declared shape, are kept as `Unsupported` and
/// skipped by segment extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum TripNode {
    Feature(Feature),
    FeatureCollection(FeatureCollection),
    Unsupported(Value),
}

impl TripNode {
    /// First feature reached by depth-first descent, if any.
    pub fn first_feature(&self) -> Option<&Feature> {
        match self {
            TripNode::Feature(feature) => Some(feature),
            TripNode::FeatureCollection(collection) => collection.first_feature(),
            TripNode::Unsupported(_) => None,
        }
    }

    fn from_value(value: Value) -> Self {
        let kind = match value.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            Some(_) => String::new(),
            None if value.get("features").is_some_and(Value::is_array) => {
                "FeatureCollection".to_string()
            }
            None => "Feature".to_string(),
        };

        let parsed = match kind.as_str() {
            "Feature" => Feature::deserialize(&value).map(TripNode::Feature),
            "FeatureCollection" => {
                FeatureCollection::deserialize(&value).map(TripNode::FeatureCollection)
            }
            _ => {
                debug!("[Geojson] Skipping node of type '{}'", kind);
                return TripNode::Unsupported(value);
            }
        };

        parsed.unwrap_or_else(|e| {
            warn!("[Geojson] Skipping malformed {}: {}", kind, e);
            TripNode::Unsupported(value)
        })
    }
}

impl<'de> Deserialize<'de> for TripNode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(TripNode::from_value(Value::deserialize(deserializer)?))
    }
}

impl Serialize for TripNode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let (kind, body) = match self {
            TripNode::Feature(feature) => ("Feature", serde_json::to_value(feature)),
            TripNode::FeatureCollection(collection) => {
                ("FeatureCollection", serde_json::to_value(collection))
            }
            TripNode::Unsupported(value) => return value.serialize(serializer),
        };
        let mut body = body.map_err(ser::Error::custom)?;
        if let Value::Object(map) = &mut body {
            map.insert("type".to_string(), Value::String(kind.to_string()));
        }
        body.serialize(serializer)
    }
}

/// A nested collection; at the top level of a trip it is one mode segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: Value,
    #[serde(default)]
    pub features: Vec<TripNode>,
}

impl FeatureCollection {
    pub fn first_feature(&self) -> Option<&Feature> {
        self.features.iter().find_map(TripNode::first_feature)
    }
}

/// A single GPS feature (point or line) with its sensor-derived properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: FeatureProperties,
}

impl Feature {
    /// Coordinates of the feature geometry, empty when there is none.
    pub fn coordinates(&self) -> Vec<GpsPoint> {
        self.geometry
            .as_ref()
            .map(Geometry::points)
            .unwrap_or_default()
    }
}

/// Properties of a GPS feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    /// Detected mode, formatted as `PredictedModeTypes.<MODE>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensed_mode: Option<String>,
    /// Mode set by the user, a bare tag such as `BICYCLING`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_mode: Option<String>,
    /// Distance in meters
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance: f64,
    /// Duration in seconds
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_fmt_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_fmt_time: Option<String>,
    /// Epoch milliseconds, aligned with `distances` and `speeds`
    #[serde(default, deserialize_with = "lenient_f64_vec")]
    pub timestamps: Vec<f64>,
    /// Incremental distances in meters
    #[serde(default, deserialize_with = "lenient_f64_vec")]
    pub distances: Vec<f64>,
    /// Instantaneous speeds in m/s
    #[serde(default, deserialize_with = "lenient_f64_vec")]
    pub speeds: Vec<f64>,
}

/// GeoJSON geometry. Positions are `[longitude, latitude, ...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Vec<f64> },
    LineString { coordinates: Vec<Vec<f64>> },
    #[serde(other)]
    Unsupported,
}

impl Geometry {
    pub fn points(&self) -> Vec<GpsPoint> {
        fn to_point(position: &[f64]) -> Option<GpsPoint> {
            match position {
                [lng, lat, ..] => Some(GpsPoint::new(*lat, *lng)),
                _ => None,
            }
        }

        match self {
            Geometry::Point { coordinates } => to_point(coordinates).into_iter().collect(),
            Geometry::LineString { coordinates } => {
                coordinates.iter().filter_map(|p| to_point(p)).collect()
            }
            Geometry::Unsupported => Vec::new(),
        }
    }
}

// ============================================================================
// Timeseries
// ============================================================================

/// A timeseries document: one or more trips recorded by a source account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeseries {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub cozy_metadata: CozyMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,
    #[serde(default)]
    pub series: Vec<Trip>,
}

impl Timeseries {
    /// Parse a timeseries document from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse an array of timeseries documents, as returned by a query.
    pub fn list_from_json(json: &str) -> Result<Vec<Self>> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CozyMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_account: Option<String>,
}
