//! Per-mode and per-purpose breakdowns over a set of timeseries.
//!
//! Both breakdowns are sorted by emissions, highest first, so the first
//! entry is the one worth acting on. Ties fall back to distance, then to the
//! key itself to keep the output stable.
//!
//! ## Example
//! ```rust
//! use coachco2::{aggregate_by_mode, Timeseries};
//!
//! let stats = aggregate_by_mode(&[Timeseries::default()]);
//! assert!(stats.is_empty());
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::geojson::{Timeseries, Trip};
use crate::modes::Mode;
use crate::segments::extract_segments;
use crate::trips::{purpose, segment_calories, segment_co2, transform_timeseries_to_trips};

/// Label used for trips without a purpose.
pub const UNKNOWN_PURPOSE: &str = "UNKNOWN";

/// Below this many trips the parallel breakdown runs sequentially.
#[cfg(feature = "parallel")]
const PARALLEL_MIN_TRIPS: usize = 1_000;

/// Totals for one transport mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeStats {
    pub mode: Mode,
    /// Meters
    pub total_distance: f64,
    /// Seconds
    pub total_duration: f64,
    /// kg CO2-equivalent
    #[serde(rename = "totalCO2")]
    pub total_co2: f64,
    pub total_calories: f64,
    /// Trips with at least one segment in this mode
    pub trip_count: usize,
    pub segment_count: usize,
    /// Share of the overall emissions, 0 to 100
    pub co2_percentage: f64,
}

impl ModeStats {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            total_distance: 0.0,
            total_duration: 0.0,
            total_co2: 0.0,
            total_calories: 0.0,
            trip_count: 0,
            segment_count: 0,
            co2_percentage: 0.0,
        }
    }

    fn merge(&mut self, other: &ModeStats) {
        self.total_distance += other.total_distance;
        self.total_duration += other.total_duration;
        self.total_co2 += other.total_co2;
        self.total_calories += other.total_calories;
        self.trip_count += other.trip_count;
        self.segment_count += other.segment_count;
    }
}

/// Totals for one trip purpose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurposeStats {
    /// Purpose set by the user, or [`UNKNOWN_PURPOSE`]
    pub purpose: String,
    pub total_distance: f64,
    #[serde(rename = "totalCO2")]
    pub total_co2: f64,
    pub total_calories: f64,
    pub trip_count: usize,
    pub co2_percentage: f64,
}

fn clamped(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn percentage(value: f64, total: f64) -> f64 {
    if total > 0.0 {
        value / total * 100.0
    } else {
        0.0
    }
}

fn by_emissions(co2: (f64, f64), distance: (f64, f64)) -> Ordering {
    co2.1
        .total_cmp(&co2.0)
        .then_with(|| distance.1.total_cmp(&distance.0))
}

// ============================================================================
// By mode
// ============================================================================

fn add_trip(acc: &mut HashMap<Mode, ModeStats>, trip: &Trip) {
    let mut seen: Vec<Mode> = Vec::new();
    for segment in extract_segments(trip) {
        let stats = acc
            .entry(segment.mode)
            .or_insert_with(|| ModeStats::new(segment.mode));
        stats.total_distance += clamped(segment.distance);
        stats.total_duration += clamped(segment.duration);
        stats.total_co2 += segment_co2(&segment);
        stats.total_calories += segment_calories(&segment);
        stats.segment_count += 1;
        if !seen.contains(&segment.mode) {
            stats.trip_count += 1;
            seen.push(segment.mode);
        }
    }
}

fn finish_modes(acc: HashMap<Mode, ModeStats>) -> Vec<ModeStats> {
    let total_co2: f64 = acc.values().map(|s| s.total_co2).sum();
    let mut stats: Vec<ModeStats> = acc
        .into_values()
        .map(|mut s| {
            s.co2_percentage = percentage(s.total_co2, total_co2);
            s
        })
        .collect();

    stats.sort_by(|a, b| {
        by_emissions((a.total_co2, b.total_co2), (a.total_distance, b.total_distance))
            .then_with(|| a.mode.cmp(&b.mode))
    });
    stats
}

/// Totals per transport mode, highest emitter first.
pub fn aggregate_by_mode(timeseries: &[Timeseries]) -> Vec<ModeStats> {
    let trips = transform_timeseries_to_trips(timeseries);
    let mut acc: HashMap<Mode, ModeStats> = HashMap::new();
    for trip in &trips {
        add_trip(&mut acc, trip);
    }

    debug!(
        "[Analysis] {} modes over {} trips",
        acc.len(),
        trips.len()
    );
    finish_modes(acc)
}

/// [`aggregate_by_mode`] spread over the rayon thread pool.
/// Worth it for several thousand trips.
#[cfg(feature = "parallel")]
pub fn aggregate_by_mode_parallel(timeseries: &[Timeseries]) -> Vec<ModeStats> {
    let trips = transform_timeseries_to_trips(timeseries);
    if trips.len() < PARALLEL_MIN_TRIPS {
        return aggregate_by_mode(timeseries);
    }

    let acc = trips
        .par_iter()
        .fold(HashMap::new, |mut acc, trip| {
            add_trip(&mut acc, trip);
            acc
        })
        .reduce(HashMap::new, |mut left, right| {
            for (mode, stats) in right {
                left.entry(mode)
                    .or_insert_with(|| ModeStats::new(mode))
                    .merge(&stats);
            }
            left
        });

    debug!(
        "[Analysis] {} modes over {} trips (parallel)",
        acc.len(),
        trips.len()
    );
    finish_modes(acc)
}

// ============================================================================
// By purpose
// ============================================================================

/// Totals per trip purpose, highest emitter first.
pub fn aggregate_by_purpose(timeseries: &[Timeseries]) -> Vec<PurposeStats> {
    let mut stats: Vec<PurposeStats> = Vec::new();

    for trip in transform_timeseries_to_trips(timeseries) {
        let key = purpose(trip).unwrap_or_else(|| UNKNOWN_PURPOSE.to_string());
        let segments = extract_segments(trip);

        let index = match stats.iter().position(|s| s.purpose == key) {
            Some(i) => i,
            None => {
                stats.push(PurposeStats {
                    purpose: key,
                    total_distance: 0.0,
                    total_co2: 0.0,
                    total_calories: 0.0,
                    trip_count: 0,
                    co2_percentage: 0.0,
                });
                stats.len() - 1
            }
        };
        let entry = &mut stats[index];
        entry.total_distance += segments.iter().map(|s| clamped(s.distance)).sum::<f64>();
        entry.total_co2 += segments.iter().map(segment_co2).sum::<f64>();
        entry.total_calories += segments.iter().map(segment_calories).sum::<f64>();
        entry.trip_count += 1;
    }

    let total_co2: f64 = stats.iter().map(|s| s.total_co2).sum();
    for s in &mut stats {
        s.co2_percentage = percentage(s.total_co2, total_co2);
    }
    stats.sort_by(|a, b| {
        by_emissions((a.total_co2, b.total_co2), (a.total_distance, b.total_distance))
            .then_with(|| a.purpose.cmp(&b.purpose))
    });

    debug!("[Analysis] {} purposes", stats.len());
    stats
}
