//! # CoachCO2 core
//!
//! Trip metrics for a personal mobility and carbon-footprint tracker.
//!
//! This library provides:
//! - Transport mode classification of recorded GPS features
//! - Segment extraction from nested GeoJSON trip documents
//! - Calorie and CO2 aggregation per trip, per mode and per purpose
//! - Display formatting (kcal, kg, %, km, min, km/h)
//! - Query descriptors for fetching timeseries from the document store
//! - Bike-to-work goal tracking
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel analysis over large timeseries sets with rayon
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use coachco2::{compute_and_format_co2_trip, modes_sorted_by_distance, Trip};
//!
//! let trip = Trip::from_json(r#"{
//!     "type": "FeatureCollection",
//!     "properties": {},
//!     "features": [{
//!         "type": "FeatureCollection",
//!         "features": [{
//!             "type": "Feature",
//!             "properties": { "sensed_mode": "PredictedModeTypes.CAR", "distance": 14789, "duration": 1800 }
//!         }]
//!     }]
//! }"#).unwrap();
//!
//! assert_eq!(compute_and_format_co2_trip(&trip), "2.84 kg");
//! assert_eq!(modes_sorted_by_distance(&trip).len(), 1);
//! ```

use geo::{BoundingRect, Coord, MultiPoint, Point};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{CoachError, OptionExt, Result};

// Trip and timeseries documents
pub mod geojson;
pub use geojson::{
    CozyMetadata, Feature, FeatureCollection, FeatureProperties, Geometry, Place, Timeseries,
    Trip, TripNode, TripProperties,
};

// Transport mode classification
pub mod modes;
pub use modes::{classify_mode, Mode};

// Segment extraction
pub mod segments;
pub use segments::{extract_segments, parse_date, trip_bounds, Segment};

// Trip aggregation (calories, CO2, modes, purposes, days)
pub mod trips;
pub use trips::{
    compute_aggregation, compute_calories, compute_co2, compute_co2_by_mode,
    count_days_in_period, modes_sorted_by_distance, purpose, transform_timeseries_to_trips,
    trip_end_date, trip_start_date, Aggregation,
};

// Display formatting
pub mod format;
pub use format::{
    compute_and_format_calories_trip, compute_and_format_co2_trip,
    compute_and_format_co2_trip_by_mode, format_calories, format_co2, format_distance,
    format_duration, format_percentage, format_segments, format_speed, FormattedSegment, Locale,
};

// Document-store query descriptors
pub mod queries;
pub use queries::{QueryDefinition, QueryDescriptor, QueryOptions, SimilarTripsParams};

// Bike-to-work goal
pub mod goals;
pub use goals::{
    count_days_or_days_to_reach, filter_timeseries_by_year, goal_achievement_percentage,
    is_goal_completed, AppSettings, BikeGoalConfig, BIKE_GOAL_FLAG,
};

// Per-mode and per-purpose analysis
pub mod analysis;
pub use analysis::{aggregate_by_mode, aggregate_by_purpose, ModeStats, PurposeStats};
#[cfg(feature = "parallel")]
pub use analysis::aggregate_by_mode_parallel;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use coachco2::GpsPoint;
/// let point = GpsPoint::new(48.7799432, 2.31251);
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

impl From<GpsPoint> for Coord {
    fn from(p: GpsPoint) -> Self {
        Coord {
            x: p.longitude,
            y: p.latitude,
        }
    }
}

/// Bounding box of a set of points, used to fit a trip on a map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points, ignoring invalid ones.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        let multi: MultiPoint<f64> = points
            .iter()
            .filter(|p| p.is_valid())
            .map(|&p| Point::from(Coord::from(p)))
            .collect();

        multi.bounding_rect().map(|rect| Self {
            min_lat: rect.min().y,
            max_lat: rect.max().y,
            min_lng: rect.min().x,
            max_lng: rect.max().x,
        })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
