//! Bike-to-work goal tracking.
//!
//! The goal is reached once the user has cycled to work on a configured
//! number of distinct days in a year. The target comes from the
//! `coachco2.bikegoal.settings` feature flag and has no sensible default: a
//! missing or empty target is reported as [`CoachError::MissingConfiguration`]
//! instead of silently computing progress against a made-up number.
//!
//! ## Example
//! ```rust
//! use coachco2::goals::{goal_achievement_percentage, BikeGoalConfig};
//! use serde_json::json;
//!
//! let flag = json!({ "daysToReach": 30, "bountyAmount": 200 });
//! let config = BikeGoalConfig::from_flag(Some(&flag)).unwrap();
//! assert_eq!(goal_achievement_percentage(Some(&[]), &config), 0);
//! assert_eq!(goal_achievement_percentage(None, &config), 100);
//!
//! assert!(BikeGoalConfig::from_flag(None).is_err());
//! ```

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoachError, OptionExt, Result};
use crate::geojson::Timeseries;
use crate::modes::Mode;
use crate::segments::parse_fmt_time;
use crate::trips::count_days_in_period;

/// Feature flag holding the bike goal configuration.
pub const BIKE_GOAL_FLAG: &str = "coachco2.bikegoal.settings";

/// Bike goal target, read from [`BIKE_GOAL_FLAG`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BikeGoalConfig {
    /// Distinct cycling days needed to complete the goal
    pub days_to_reach: u32,
    /// Bounty paid by the employer once the goal is reached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounty_amount: Option<f64>,
}

fn positive_number(flag: &Value, field: &str) -> Option<f64> {
    flag.get(field)
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite() && *n > 0.0)
}

impl BikeGoalConfig {
    /// Read the configuration from the flag value, `None` when the flag is unset.
    pub fn from_flag(flag: Option<&Value>) -> Result<Self> {
        let result = flag
            .filter(|f| f.is_object())
            .and_then(|f| positive_number(f, "daysToReach"))
            .map(f64::round)
            .filter(|days| *days >= 1.0)
            .ok_or_missing_config(BIKE_GOAL_FLAG, "daysToReach")
            .map(|days| Self {
                days_to_reach: days as u32,
                bounty_amount: flag.and_then(|f| positive_number(f, "bountyAmount")),
            });

        if let Err(e) = &result {
            warn!("[Goals] {}", e);
        }
        result
    }

    /// Bounty amount, required to generate the goal certificate.
    pub fn bounty_amount(&self) -> Result<f64> {
        self.bounty_amount
            .ok_or_missing_config(BIKE_GOAL_FLAG, "bountyAmount")
    }
}

/// Bike goal preferences stored in the settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BikeGoalSettings {
    #[serde(default, rename = "sendToDACC")]
    pub send_to_dacc: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_alert: Option<bool>,
}

impl BikeGoalSettings {
    /// Whether to show the goal alert; on unless the user turned it off.
    pub fn show_alert(&self) -> bool {
        self.show_alert.unwrap_or(true)
    }
}

/// The `io.cozy.coachco2.settings` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub bike_goal: BikeGoalSettings,
}

impl AppSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(CoachError::from)
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Distinct cycling days, capped at the goal target.
pub fn count_days_or_days_to_reach(timeseries: &[Timeseries], config: &BikeGoalConfig) -> u32 {
    let days = count_days_in_period(timeseries, Mode::Bicycling) as u32;
    days.min(config.days_to_reach)
}

pub fn is_goal_completed(timeseries: &[Timeseries], config: &BikeGoalConfig) -> bool {
    count_days_in_period(timeseries, Mode::Bicycling) as u32 >= config.days_to_reach
}

/// Rounded progress towards the goal, 0 to 100. Without timeseries the
/// chart is shown full.
pub fn goal_achievement_percentage(timeseries: Option<&[Timeseries]>, config: &BikeGoalConfig) -> u32 {
    let Some(timeseries) = timeseries else {
        return 100;
    };
    if config.days_to_reach == 0 {
        return 100;
    }
    let days = count_days_or_days_to_reach(timeseries, config);
    (days as f64 / config.days_to_reach as f64 * 100.0).round() as u32
}

/// Timeseries started during `year`, in the UTC offset they were recorded in.
pub fn filter_timeseries_by_year(timeseries: &[Timeseries], year: i32) -> Vec<&Timeseries> {
    use chrono::Datelike;

    timeseries
        .iter()
        .filter(|ts| {
            ts.start_date
                .as_deref()
                .and_then(parse_fmt_time)
                .is_some_and(|d| d.year() == year)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_flag() {
        let flag = json!({ "daysToReach": 30, "bountyAmount": 200 });
        let config = BikeGoalConfig::from_flag(Some(&flag)).unwrap();
        assert_eq!(config.days_to_reach, 30);
        assert_eq!(config.bounty_amount(), Ok(200.0));
    }

    #[test]
    fn test_missing_flag() {
        let err = BikeGoalConfig::from_flag(None).unwrap_err();
        assert_eq!(
            err,
            CoachError::MissingConfiguration {
                flag: BIKE_GOAL_FLAG.to_string(),
                field: "daysToReach".to_string(),
            }
        );
    }

    #[test]
    fn test_zero_days_to_reach() {
        let flag = json!({ "daysToReach": 0 });
        assert!(BikeGoalConfig::from_flag(Some(&flag)).is_err());
        assert!(BikeGoalConfig::from_flag(Some(&Value::Null)).is_err());
    }

    #[test]
    fn test_days_to_reach_rounding_to_zero() {
        let flag = json!({ "daysToReach": 0.4, "bountyAmount": 100 });
        assert!(matches!(
            BikeGoalConfig::from_flag(Some(&flag)),
            Err(CoachError::MissingConfiguration { ref field, .. }) if field == "daysToReach"
        ));

        let flag = json!({ "daysToReach": 0.6 });
        assert_eq!(BikeGoalConfig::from_flag(Some(&flag)).unwrap().days_to_reach, 1);
    }

    #[test]
    fn test_missing_bounty() {
        let flag = json!({ "daysToReach": 10 });
        let config = BikeGoalConfig::from_flag(Some(&flag)).unwrap();
        assert!(matches!(
            config.bounty_amount(),
            Err(CoachError::MissingConfiguration { .. })
        ));
    }

    #[test]
    fn test_settings_show_alert_defaults_on() {
        let settings = AppSettings::from_json(r#"{ "_id": "s1", "bikeGoal": { "sendToDACC": true } }"#).unwrap();
        assert!(settings.bike_goal.send_to_dacc);
        assert!(settings.bike_goal.show_alert());

        let settings = AppSettings::from_json(r#"{ "bikeGoal": { "showAlert": false } }"#).unwrap();
        assert!(!settings.bike_goal.show_alert());
    }

    #[test]
    fn test_filter_by_year() {
        let make = |id: &str, start: Option<&str>| Timeseries {
            id: id.to_string(),
            start_date: start.map(String::from),
            ..Default::default()
        };
        let all = vec![
            make("a", Some("2021-12-31T23:30:00+01:00")),
            make("b", Some("2022-01-01T00:30:00+01:00")),
            make("c", None),
            make("d", Some("")),
        ];
        let ids: Vec<&str> = filter_timeseries_by_year(&all, 2022)
            .iter()
            .map(|ts| ts.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b"]);
    }
}
