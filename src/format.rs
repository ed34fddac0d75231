//! Display formatting of trip metrics.
//!
//! Formatters never fail: negative and non-finite inputs are shown as zero.
//!
//! ## Example
//! ```rust
//! use coachco2::format::{format_co2, format_percentage, format_calories};
//!
//! assert_eq!(format_co2(2.839488), "2.84 kg");
//! assert_eq!(format_calories(104.13), "104 kcal");
//! assert_eq!(format_percentage(50.0, 90.0), "55.56%");
//! assert_eq!(format_percentage(50.0, 0.0), "0%");
//! ```

use serde::{Deserialize, Serialize};

use crate::geojson::Trip;
use crate::modes::Mode;
use crate::segments::{extract_segments, Segment};
use crate::trips::{compute_calories, compute_co2, compute_co2_by_mode, segment_calories, segment_co2};

/// Display language, used for the decimal separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Fr,
}

impl Locale {
    /// Locale from a language code such as `"en"` or `"fr-FR"`.
    pub fn from_lang(lang: &str) -> Self {
        match lang.split(['-', '_']).next() {
            Some(code) if code.eq_ignore_ascii_case("fr") => Locale::Fr,
            _ => Locale::En,
        }
    }

    pub fn decimal_separator(&self) -> char {
        match self {
            Locale::En => '.',
            Locale::Fr => ',',
        }
    }
}

fn clamp(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Round to at most `decimals` places and drop trailing zeros.
fn trimmed_number(value: f64, decimals: i32, locale: Locale) -> String {
    let factor = 10f64.powi(decimals);
    // `+ 0.0` turns a rounded -0.0 into 0.0
    let rounded = (clamp(value) * factor).round() / factor + 0.0;
    let text = rounded.to_string();
    match locale.decimal_separator() {
        '.' => text,
        sep => text.replace('.', &sep.to_string()),
    }
}

// ============================================================================
// Scalar formatters
// ============================================================================

/// Calories as a rounded integer, e.g. `"104 kcal"`.
pub fn format_calories(kcal: f64) -> String {
    format!("{} kcal", clamp(kcal).round() as u64)
}

/// CO2 mass in kg with at most two decimals, e.g. `"2.84 kg"` or `"0 kg"`.
pub fn format_co2(kg: f64) -> String {
    format_co2_localized(kg, Locale::En)
}

pub fn format_co2_localized(kg: f64, locale: Locale) -> String {
    format!("{} kg", trimmed_number(kg, 2, locale))
}

/// Share of `value` in `total`: whole numbers without decimals, anything
/// else with exactly two (`"50%"`, `"62.50%"`). A zero total gives `"0%"`.
pub fn format_percentage(value: f64, total: f64) -> String {
    format_percentage_localized(value, total, Locale::En)
}

pub fn format_percentage_localized(value: f64, total: f64, locale: Locale) -> String {
    if total == 0.0 || !total.is_finite() {
        return "0%".to_string();
    }
    let percentage = clamp(value / total * 100.0);

    if percentage.fract() == 0.0 {
        format!("{}%", percentage as u64)
    } else {
        let text = format!("{:.2}", percentage);
        match locale.decimal_separator() {
            '.' => format!("{}%", text),
            sep => format!("{}%", text.replace('.', &sep.to_string())),
        }
    }
}

/// Distance: meters below one kilometer, rounded kilometers above.
pub fn format_distance(meters: f64) -> String {
    let meters = clamp(meters);
    if meters < 1000.0 {
        format!("{} m", meters.round() as u64)
    } else {
        format!("{} km", (meters / 1000.0).round() as u64)
    }
}

/// Duration in minutes, with hours past the first hour (`"1 h 05 min"`).
pub fn format_duration(seconds: f64) -> String {
    let minutes = (clamp(seconds) / 60.0).round() as u64;
    if minutes < 60 {
        format!("{} min", minutes)
    } else {
        format!("{} h {:02} min", minutes / 60, minutes % 60)
    }
}

/// Speed given in m/s, shown in rounded km/h.
pub fn format_speed(meters_per_second: f64) -> String {
    format!("{} km/h", (clamp(meters_per_second) * 3.6).round() as u64)
}

// ============================================================================
// Trip formatters
// ============================================================================

pub fn compute_and_format_calories_trip(trip: &Trip) -> String {
    format_calories(compute_calories(trip))
}

pub fn compute_and_format_co2_trip(trip: &Trip) -> String {
    format_co2(compute_co2(trip))
}

pub fn compute_and_format_co2_trip_by_mode(trip: &Trip, mode: Mode) -> String {
    format_co2(compute_co2_by_mode(trip, mode))
}

/// Display-ready view of a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedSegment {
    pub id: Option<String>,
    pub mode: Mode,
    pub distance: String,
    pub duration: String,
    /// Distance over duration
    pub average_speed: String,
    /// Mean of the recorded speed samples
    pub mean_speed: String,
    pub co2: String,
    pub calories: String,
    /// Local start time, `HH:MM`
    pub start_time: Option<String>,
    /// Local end time, `HH:MM`
    pub end_time: Option<String>,
}

impl FormattedSegment {
    pub fn from_segment(segment: &Segment, locale: Locale) -> Self {
        Self {
            id: segment.id.clone(),
            mode: segment.mode,
            distance: format_distance(segment.distance),
            duration: format_duration(segment.duration),
            average_speed: format_speed(segment.average_speed),
            mean_speed: format_speed(segment.mean_speed()),
            co2: format_co2_localized(segment_co2(segment), locale),
            calories: format_calories(segment_calories(segment)),
            start_time: segment.start_date.map(|d| d.format("%H:%M").to_string()),
            end_time: segment.end_date.map(|d| d.format("%H:%M").to_string()),
        }
    }
}

/// Formatted views of every segment of a trip, in order.
pub fn format_segments(trip: &Trip, locale: Locale) -> Vec<FormattedSegment> {
    extract_segments(trip)
        .iter()
        .map(|s| FormattedSegment::from_segment(s, locale))
        .collect()
}
