//! Segment extraction from trip documents.
//!
//! Each nested feature collection at the top level of a trip is one segment:
//! a stretch traveled with a single mode. Bare top-level features are place
//! markers and never produce a segment.

use chrono::{DateTime, FixedOffset};
use geo::LineString;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{OptionExt, Result};
use crate::geojson::{FeatureCollection, Trip, TripNode};
use crate::modes::{classify_mode, Mode};
use crate::{Bounds, GpsPoint};

/// One mode segment of a trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: Option<String>,
    pub mode: Mode,
    /// Distance in meters
    pub distance: f64,
    /// Incremental distances in meters
    pub distances: Vec<f64>,
    /// Duration in seconds
    pub duration: f64,
    /// Epoch milliseconds
    pub timestamps: Vec<f64>,
    /// Instantaneous speeds in m/s
    pub speeds: Vec<f64>,
    /// distance / duration in m/s, 0 when the duration is unknown
    pub average_speed: f64,
    pub start_date: Option<DateTime<FixedOffset>>,
    pub end_date: Option<DateTime<FixedOffset>>,
    pub coordinates: Vec<GpsPoint>,
}

impl Segment {
    fn from_collection(collection: &FeatureCollection) -> Self {
        let Some(feature) = collection.first_feature() else {
            return Self::empty(collection.id.clone());
        };
        let props = &feature.properties;

        let average_speed = if props.duration > 0.0 {
            props.distance / props.duration
        } else {
            0.0
        };

        Self {
            id: collection.id.clone().or_else(|| feature.id.clone()),
            mode: classify_mode(feature),
            distance: props.distance,
            distances: props.distances.clone(),
            duration: props.duration,
            timestamps: props.timestamps.clone(),
            speeds: props.speeds.clone(),
            average_speed,
            start_date: props.start_fmt_time.as_deref().and_then(parse_fmt_time),
            end_date: props.end_fmt_time.as_deref().and_then(parse_fmt_time),
            coordinates: feature.coordinates(),
        }
    }

    fn empty(id: Option<String>) -> Self {
        Self {
            id,
            mode: Mode::Unknown,
            distance: 0.0,
            distances: Vec::new(),
            duration: 0.0,
            timestamps: Vec::new(),
            speeds: Vec::new(),
            average_speed: 0.0,
            start_date: None,
            end_date: None,
            coordinates: Vec::new(),
        }
    }

    /// Segment geometry as a geo line string (x = longitude, y = latitude).
    pub fn line_string(&self) -> LineString<f64> {
        self.coordinates.iter().map(|&p| geo::Coord::from(p)).collect()
    }

    /// Mean of the recorded instantaneous speeds in m/s, 0 without samples.
    pub fn mean_speed(&self) -> f64 {
        if self.speeds.is_empty() {
            return 0.0;
        }
        self.speeds.iter().sum::<f64>() / self.speeds.len() as f64
    }
}

/// Parse an RFC 3339 date such as `2021-12-07T16:24:49+01:00`, keeping its
/// UTC offset.
pub fn parse_date(value: &str) -> Result<DateTime<FixedOffset>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .ok()
        .ok_or_invalid_date(value)
}

/// Lenient [`parse_date`] for optional `*_fmt_time` values.
pub(crate) fn parse_fmt_time(value: &str) -> Option<DateTime<FixedOffset>> {
    if value.trim().is_empty() {
        return None;
    }
    match parse_date(value) {
        Ok(date) => Some(date),
        Err(e) => {
            debug!("[Segments] Ignoring {}", e);
            None
        }
    }
}

/// Flatten a trip into its ordered mode segments.
pub fn extract_segments(trip: &Trip) -> Vec<Segment> {
    let segments: Vec<Segment> = trip
        .features
        .iter()
        .filter_map(|node| match node {
            TripNode::FeatureCollection(collection) => Some(Segment::from_collection(collection)),
            TripNode::Feature(_) | TripNode::Unsupported(_) => None,
        })
        .collect();

    debug!(
        "[Segments] Extracted {} segments from trip {:?}",
        segments.len(),
        trip.id
    );
    segments
}

/// Bounding box of every segment coordinate of a trip.
pub fn trip_bounds(trip: &Trip) -> Option<Bounds> {
    let points: Vec<GpsPoint> = extract_segments(trip)
        .into_iter()
        .flat_map(|s| s.coordinates)
        .collect();
    Bounds::from_points(&points)
}
