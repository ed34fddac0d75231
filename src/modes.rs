//! Transport mode classification.
//!
//! The trip recorder tags each feature with a detected mode written as
//! `PredictedModeTypes.<MODE>`, and the user may override it with a bare
//! `manual_mode` tag. Both are parsed against a closed set of modes; anything
//! outside it becomes [`Mode::Unknown`].

use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};

use crate::geojson::Feature;

/// Prefix of the sensed mode strings written by the trip recorder.
pub const SENSED_MODE_PREFIX: &str = "PredictedModeTypes.";

/// Transport mode of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    AirOrHsr,
    Bicycling,
    Bus,
    Car,
    Subway,
    Train,
    Tram,
    Walking,
    Unknown,
}

impl Mode {
    /// Every mode, `Unknown` last.
    pub const ALL: [Mode; 9] = [
        Mode::AirOrHsr,
        Mode::Bicycling,
        Mode::Bus,
        Mode::Car,
        Mode::Subway,
        Mode::Train,
        Mode::Tram,
        Mode::Walking,
        Mode::Unknown,
    ];

    /// Tag used in documents and query selectors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::AirOrHsr => "AIR_OR_HSR",
            Mode::Bicycling => "BICYCLING",
            Mode::Bus => "BUS",
            Mode::Car => "CAR",
            Mode::Subway => "SUBWAY",
            Mode::Train => "TRAIN",
            Mode::Tram => "TRAM",
            Mode::Walking => "WALKING",
            Mode::Unknown => "UNKNOWN",
        }
    }

    /// Parse a bare mode tag, `None` if it is not a known mode.
    pub fn parse(tag: &str) -> Option<Mode> {
        match tag {
            "AIR_OR_HSR" => Some(Mode::AirOrHsr),
            "BICYCLING" => Some(Mode::Bicycling),
            "BUS" => Some(Mode::Bus),
            "CAR" => Some(Mode::Car),
            "SUBWAY" => Some(Mode::Subway),
            "TRAIN" => Some(Mode::Train),
            "TRAM" => Some(Mode::Tram),
            "WALKING" => Some(Mode::Walking),
            "UNKNOWN" => Some(Mode::Unknown),
            _ => None,
        }
    }

    /// Parse a bare mode tag, falling back to `Unknown`.
    pub fn from_tag(tag: &str) -> Mode {
        Mode::parse(tag).unwrap_or_else(|| {
            debug!("[Modes] Unsupported mode tag '{}'", tag);
            Mode::Unknown
        })
    }

    /// Parse a `PredictedModeTypes.<MODE>` string, falling back to `Unknown`.
    pub fn from_sensed(sensed: &str) -> Mode {
        match sensed.strip_prefix(SENSED_MODE_PREFIX) {
            Some(token) => Mode::from_tag(token),
            None => {
                if !sensed.is_empty() {
                    debug!("[Modes] Malformed sensed mode '{}'", sensed);
                }
                Mode::Unknown
            }
        }
    }

    /// Average emissions in kg CO2-equivalent per km traveled.
    pub fn co2_kg_per_km(&self) -> f64 {
        match self {
            Mode::Car => 0.192,
            Mode::AirOrHsr => 0.187,
            Mode::Bus => 0.104,
            Mode::Train => 0.0052,
            Mode::Subway => 0.0038,
            Mode::Tram => 0.0033,
            Mode::Bicycling | Mode::Walking | Mode::Unknown => 0.0,
        }
    }

    /// Average energy expenditure in kcal per km traveled.
    /// Motorized modes burn nothing attributable to the trip.
    pub fn kcal_per_km(&self) -> f64 {
        match self {
            Mode::Bicycling => 42.4,
            Mode::Walking => 40.9,
            _ => 0.0,
        }
    }

    pub fn is_zero_emission(&self) -> bool {
        self.co2_kg_per_km() == 0.0
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Stored documents may carry tags this crate does not know yet.
impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(Mode::from_tag(&tag))
    }
}

/// Mode of a feature: a non-empty manual mode wins over the sensed one.
pub fn classify_mode(feature: &Feature) -> Mode {
    let props = &feature.properties;

    let manual = props
        .manual_mode
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());
    if let Some(manual) = manual {
        return Mode::parse(manual).unwrap_or_else(|| {
            warn!("[Modes] Discarding unsupported manual mode '{}'", manual);
            Mode::Unknown
        });
    }

    props
        .sensed_mode
        .as_deref()
        .map(|s| Mode::from_sensed(s.trim()))
        .unwrap_or(Mode::Unknown)
}
