//! Trip aggregation: calories, CO2, distance, modes, purposes and days.
//!
//! Every function here is total. A trip without segments aggregates to zero,
//! and a segment with an unknown distance contributes zero while still
//! counting as a segment.

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::geojson::{Timeseries, Trip};
use crate::modes::Mode;
use crate::segments::{extract_segments, parse_fmt_time, Segment};

/// Summary stored alongside a timeseries, used by store-side selectors
/// such as `aggregation.totalDistance` or `aggregation.modes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    /// Distance in meters
    #[serde(default)]
    pub total_distance: f64,
    /// Duration in seconds
    #[serde(default)]
    pub total_duration: f64,
    /// Emissions in kg CO2-equivalent
    #[serde(rename = "totalCO2", default)]
    pub total_co2: f64,
    #[serde(default)]
    pub total_calories: f64,
    /// Modes by descending distance
    #[serde(default)]
    pub modes: Vec<Mode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_place_display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_place_display_name: Option<String>,
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

pub(crate) fn segment_co2(segment: &Segment) -> f64 {
    segment.mode.co2_kg_per_km() * non_negative(segment.distance) / 1000.0
}

pub(crate) fn segment_calories(segment: &Segment) -> f64 {
    segment.mode.kcal_per_km() * non_negative(segment.distance) / 1000.0
}

/// Calories burned over a trip, in kcal.
pub fn compute_calories(trip: &Trip) -> f64 {
    extract_segments(trip).iter().map(segment_calories).sum()
}

/// CO2 emitted over a trip, in kg.
pub fn compute_co2(trip: &Trip) -> f64 {
    extract_segments(trip).iter().map(segment_co2).sum()
}

/// CO2 emitted by the segments of a trip traveled with `mode`, in kg.
pub fn compute_co2_by_mode(trip: &Trip, mode: Mode) -> f64 {
    extract_segments(trip)
        .iter()
        .filter(|s| s.mode == mode)
        .map(segment_co2)
        .sum()
}

/// Total distance of a trip, in meters.
pub fn total_distance(trip: &Trip) -> f64 {
    extract_segments(trip)
        .iter()
        .map(|s| non_negative(s.distance))
        .sum()
}

/// Total duration of a trip, in seconds.
pub fn total_duration(trip: &Trip) -> f64 {
    extract_segments(trip)
        .iter()
        .map(|s| non_negative(s.duration))
        .sum()
}

/// Modes ordered by descending total distance. Ties keep the order in which
/// modes first appear; modes with no distance are left out.
pub(crate) fn modes_by_distance<'a>(segments: impl IntoIterator<Item = &'a Segment>) -> Vec<Mode> {
    let mut totals: Vec<(Mode, f64)> = Vec::new();
    for segment in segments {
        let distance = non_negative(segment.distance);
        match totals.iter_mut().find(|(mode, _)| *mode == segment.mode) {
            Some((_, total)) => *total += distance,
            None => totals.push((segment.mode, distance)),
        }
    }

    totals.retain(|(_, total)| *total > 0.0);
    // Stable sort keeps first-encountered order on ties
    totals.sort_by(|a, b| b.1.total_cmp(&a.1));
    totals.into_iter().map(|(mode, _)| mode).collect()
}

/// Modes of a trip ordered by descending distance.
pub fn modes_sorted_by_distance(trip: &Trip) -> Vec<Mode> {
    modes_by_distance(&extract_segments(trip))
}

/// Purpose set by the user on the trip, if any.
pub fn purpose(trip: &Trip) -> Option<String> {
    trip.properties
        .manual_purpose
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(String::from)
}

pub fn trip_start_date(trip: &Trip) -> Option<DateTime<FixedOffset>> {
    trip.properties
        .start_fmt_time
        .as_deref()
        .and_then(parse_fmt_time)
}

pub fn trip_end_date(trip: &Trip) -> Option<DateTime<FixedOffset>> {
    trip.properties.end_fmt_time.as_deref().and_then(parse_fmt_time)
}

/// Flatten timeseries documents into their trips, in document order.
pub fn transform_timeseries_to_trips(timeseries: &[Timeseries]) -> Vec<&Trip> {
    timeseries.iter().flat_map(|ts| ts.series.iter()).collect()
}

/// Number of distinct calendar days on which a segment of `mode` started.
///
/// Days are taken in the UTC offset recorded with each date, so a ride at
/// 00:30+02:00 counts for that local day. A segment without its own start
/// date falls back to the start date of its trip.
pub fn count_days_in_period(timeseries: &[Timeseries], mode: Mode) -> usize {
    let mut days: BTreeSet<NaiveDate> = BTreeSet::new();

    for trip in transform_timeseries_to_trips(timeseries) {
        let trip_start = trip_start_date(trip);
        for segment in extract_segments(trip) {
            if segment.mode != mode {
                continue;
            }
            if let Some(start) = segment.start_date.or(trip_start) {
                days.insert(start.date_naive());
            }
        }
    }

    debug!(
        "[Trips] {} distinct {} days over {} timeseries",
        days.len(),
        mode,
        timeseries.len()
    );
    days.len()
}

/// Build the aggregation block of a timeseries from its trips.
pub fn compute_aggregation(timeseries: &Timeseries) -> Aggregation {
    let trips = &timeseries.series;
    let segments: Vec<Segment> = trips.iter().flat_map(extract_segments).collect();

    Aggregation {
        total_distance: segments.iter().map(|s| non_negative(s.distance)).sum(),
        total_duration: segments.iter().map(|s| non_negative(s.duration)).sum(),
        total_co2: segments.iter().map(segment_co2).sum(),
        total_calories: segments.iter().map(segment_calories).sum(),
        modes: modes_by_distance(&segments),
        purpose: trips.iter().find_map(purpose),
        start_place_display_name: trips
            .first()
            .and_then(|t| t.start_place_display_name())
            .map(String::from),
        end_place_display_name: trips
            .last()
            .and_then(|t| t.end_place_display_name())
            .map(String::from),
    }
}
