//! Query descriptors for the document store.
//!
//! A descriptor bundles a Mango-style selector with the options the store
//! client needs: a cache key (`as`) and an execution gate (`enabled`).
//! Building a descriptor never fails. When a required parameter is missing
//! the descriptor is still fully formed, with `enabled: false` and the
//! missing part of the cache key written as `undefined` or `noDate`.

use chrono::{DateTime, Datelike, Months, NaiveDate, SecondsFormat, TimeDelta, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::modes::Mode;

/// Doctype of trip timeseries.
pub const GEOJSON_DOCTYPE: &str = "io.cozy.timeseries.geojson";
/// Doctype of the app settings document.
pub const SETTINGS_DOCTYPE: &str = "io.cozy.coachco2.settings";

/// Result cap of the monthly timeseries query.
pub const MONTHLY_LIMIT: u32 = 1000;
/// Page size of the trips list.
pub const TRIPS_PAGE_LIMIT: u32 = 50;
/// Result cap of the similar trips query.
pub const SIMILAR_TRIPS_LIMIT: u32 = 50;
/// Half-width of the distance window for similar trips, in meters.
pub const DISTANCE_TOLERANCE: f64 = 50.0;
/// Purpose tag of home-to-work trips.
pub const COMMUTE_PURPOSE: &str = "COMMUTE";

/// Results younger than this are served from cache, in seconds.
const DEFAULT_FETCH_POLICY_MAX_AGE: u64 = 30;

const UNDEFINED: &str = "undefined";
const NO_DATE: &str = "noDate";

// ============================================================================
// Descriptor types
// ============================================================================

/// What to fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDefinition {
    pub doctype: String,
    pub selector: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexed_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl QueryDefinition {
    pub fn new(doctype: &str) -> Self {
        Self {
            doctype: doctype.to_string(),
            selector: Value::Object(Map::new()),
            sort: Vec::new(),
            indexed_fields: Vec::new(),
            limit: None,
        }
    }

    pub fn selector(mut self, selector: Value) -> Self {
        self.selector = selector;
        self
    }

    pub fn index_fields(mut self, fields: &[&str]) -> Self {
        self.indexed_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Sort descending on each field, in order.
    pub fn sort_desc(mut self, fields: &[&str]) -> Self {
        self.sort = fields
            .iter()
            .map(|f| {
                let mut order = Map::new();
                order.insert(f.to_string(), json!("desc"));
                Value::Object(order)
            })
            .collect();
        self
    }

    pub fn limit_by(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// How the store client should run and cache the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    /// Cache key; identical logical queries share it
    #[serde(rename = "as")]
    pub as_key: String,
    /// The query must not run while this is false
    pub enabled: bool,
    /// Cached results younger than this many seconds are reused
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_policy_max_age: Option<u64>,
}

/// A query definition with its options, ready for the store client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub definition: QueryDefinition,
    pub options: QueryOptions,
}

impl QueryDescriptor {
    fn new(definition: QueryDefinition, as_key: String, enabled: bool) -> Self {
        if !enabled {
            debug!("[Queries] Query '{}' is disabled", as_key);
        }
        Self {
            definition,
            options: QueryOptions {
                as_key,
                enabled,
                fetch_policy_max_age: Some(DEFAULT_FETCH_POLICY_MAX_AGE),
            },
        }
    }

    /// JSON shape expected by the store client.
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn iso(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `YYYY-M` with a zero-based month, as used in cache keys.
fn month_bucket(date: DateTime<Utc>) -> String {
    format!("{}-{}", date.year(), date.month0())
}

/// First and last instants (millisecond precision) of the UTC month of `date`.
fn month_bounds(date: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?
        .and_hms_opt(0, 0, 0)?
        .and_utc();
    let last = first.checked_add_months(Months::new(1))? - TimeDelta::milliseconds(1);
    Some((first, last))
}

// ============================================================================
// Builders
// ============================================================================

/// Timeseries of one account started during the calendar month of `date`.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use coachco2::queries::build_timeseries_query_by_date_and_account_id;
///
/// let date = Utc.with_ymd_and_hms(2022, 2, 1, 0, 0, 0).unwrap();
/// let query = build_timeseries_query_by_date_and_account_id(Some(date), Some("accountId"));
/// assert!(query.options.enabled);
/// assert_eq!(
///     query.options.as_key,
///     "io.cozy.timeseries.geojson/sourceAccount/accountId/date/2022-1/limitedBy/1000"
/// );
/// ```
pub fn build_timeseries_query_by_date_and_account_id(
    date: Option<DateTime<Utc>>,
    account_id: Option<&str>,
) -> QueryDescriptor {
    let account_id = present(account_id);
    let bounds = date.and_then(month_bounds);

    let (gte, lte) = match bounds {
        Some((first, last)) => (json!(iso(first)), json!(iso(last))),
        None => (Value::Null, Value::Null),
    };

    let definition = QueryDefinition::new(GEOJSON_DOCTYPE)
        .selector(json!({
            "cozyMetadata.sourceAccount": account_id,
            "startDate": { "$gte": gte, "$lte": lte },
        }))
        .index_fields(&["cozyMetadata.sourceAccount", "startDate"])
        .sort_desc(&["cozyMetadata.sourceAccount", "startDate"])
        .limit_by(MONTHLY_LIMIT);

    let as_key = format!(
        "{}/sourceAccount/{}/date/{}/limitedBy/{}",
        GEOJSON_DOCTYPE,
        account_id.unwrap_or(UNDEFINED),
        date.map(month_bucket).unwrap_or_else(|| NO_DATE.to_string()),
        MONTHLY_LIMIT
    );

    let enabled = account_id.is_some() && bounds.is_some();
    QueryDescriptor::new(definition, as_key, enabled)
}

/// Aggregated timeseries of one account started within a year before `now`.
pub fn build_one_year_old_timeseries_with_aggregation_by_account_id(
    account_id: Option<&str>,
    now: DateTime<Utc>,
) -> QueryDescriptor {
    let account_id = present(account_id);
    let from_date = now.checked_sub_months(Months::new(12));

    let definition = QueryDefinition::new(GEOJSON_DOCTYPE)
        .selector(json!({
            "cozyMetadata.sourceAccount": account_id,
            "startDate": { "$gte": from_date.map(iso) },
            "aggregation": { "$exists": true },
        }))
        .index_fields(&["cozyMetadata.sourceAccount", "startDate"])
        .sort_desc(&["cozyMetadata.sourceAccount", "startDate"]);

    let as_key = format!(
        "{}/sourceAccount/{}/withAggregation/fromDate/{}",
        GEOJSON_DOCTYPE,
        account_id.unwrap_or(UNDEFINED),
        from_date
            .map(month_bucket)
            .unwrap_or_else(|| NO_DATE.to_string())
    );

    let enabled = account_id.is_some() && from_date.is_some();
    QueryDescriptor::new(definition, as_key, enabled)
}

/// Parameters of the similar trips query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarTripsParams {
    pub account_id: Option<String>,
    pub start_place_display_name: Option<String>,
    pub end_place_display_name: Option<String>,
    /// Only trips started strictly before this date
    pub start_date: Option<DateTime<Utc>>,
    /// Reference distance in meters
    pub distance: Option<f64>,
    pub limit: Option<u32>,
}

/// Trips of an account between the same places with a total distance within
/// ±50 m of the reference distance.
pub fn build_timeseries_query_by_account_id_and_start_place_and_end_place_and_start_date_and_distance(
    params: &SimilarTripsParams,
) -> QueryDescriptor {
    let account_id = present(params.account_id.as_deref());
    let start_place = present(params.start_place_display_name.as_deref());
    let end_place = present(params.end_place_display_name.as_deref());
    let distance = params.distance.filter(|d| d.is_finite());
    let limit = params.limit.unwrap_or(SIMILAR_TRIPS_LIMIT);

    let mut selector = Map::new();
    selector.insert("cozyMetadata.sourceAccount".into(), json!(account_id));
    if let Some(name) = start_place {
        selector.insert("aggregation.startPlaceDisplayName".into(), json!(name));
    }
    if let Some(name) = end_place {
        selector.insert("aggregation.endPlaceDisplayName".into(), json!(name));
    }
    selector.insert(
        "startDate".into(),
        match params.start_date {
            Some(date) => json!({ "$lt": iso(date) }),
            None => json!({ "$gt": null }),
        },
    );
    selector.insert(
        "aggregation.totalDistance".into(),
        match distance {
            Some(d) => json!({ "$gte": d - DISTANCE_TOLERANCE, "$lte": d + DISTANCE_TOLERANCE }),
            None => json!({ "$gte": null, "$lte": null }),
        },
    );

    let definition = QueryDefinition::new(GEOJSON_DOCTYPE)
        .selector(Value::Object(selector))
        .index_fields(&[
            "cozyMetadata.sourceAccount",
            "aggregation.startPlaceDisplayName",
            "aggregation.endPlaceDisplayName",
            "startDate",
            "aggregation.totalDistance",
        ])
        .sort_desc(&["cozyMetadata.sourceAccount", "startDate"])
        .limit_by(limit);

    let as_key = format!(
        "{}/sourceAccount/{}/startPlace/{}/endPlace/{}/startDate/{}/distance/{}/limitedBy/{}",
        GEOJSON_DOCTYPE,
        account_id.unwrap_or(UNDEFINED),
        start_place.unwrap_or(UNDEFINED),
        end_place.unwrap_or(UNDEFINED),
        params.start_date.map(iso).unwrap_or_else(|| NO_DATE.to_string()),
        distance
            .map(|d| d.to_string())
            .unwrap_or_else(|| UNDEFINED.to_string()),
        limit
    );

    let enabled = account_id.is_some() && distance.is_some();
    QueryDescriptor::new(definition, as_key, enabled)
}

/// Bicycle commutes of an account. `enabled` lets the caller hold the query
/// back, e.g. while the account is still loading.
pub fn build_bike_commute_timeseries_query_by_account_id(
    account_id: Option<&str>,
    enabled: bool,
) -> QueryDescriptor {
    let account_id = present(account_id);

    let definition = QueryDefinition::new(GEOJSON_DOCTYPE)
        .selector(json!({
            "aggregation.modes": { "$elemMatch": { "$eq": Mode::Bicycling.as_str() } },
            "aggregation.purpose": COMMUTE_PURPOSE,
            "cozyMetadata.sourceAccount": account_id,
            "startDate": { "$gt": null },
        }))
        .index_fields(&[
            "aggregation.purpose",
            "cozyMetadata.sourceAccount",
            "startDate",
        ])
        .sort_desc(&["aggregation.purpose", "cozyMetadata.sourceAccount", "startDate"]);

    let as_key = format!(
        "{}/sourceAccount/{}/withPurpose/{}/withMode/{}",
        GEOJSON_DOCTYPE,
        account_id.unwrap_or(UNDEFINED),
        COMMUTE_PURPOSE,
        Mode::Bicycling
    );

    QueryDescriptor::new(definition, as_key, enabled && account_id.is_some())
}

/// Most recent timeseries of an account, one page at a time.
pub fn build_geojson_query_by_account_id(account_id: Option<&str>) -> QueryDescriptor {
    let account_id = present(account_id);

    let definition = QueryDefinition::new(GEOJSON_DOCTYPE)
        .selector(json!({ "cozyMetadata.sourceAccount": account_id }))
        .index_fields(&["cozyMetadata.sourceAccount", "startDate"])
        .sort_desc(&["cozyMetadata.sourceAccount", "startDate"])
        .limit_by(TRIPS_PAGE_LIMIT);

    let as_key = format!(
        "{}/sourceAccount/{}/limitedBy/{}",
        GEOJSON_DOCTYPE,
        account_id.unwrap_or(UNDEFINED),
        TRIPS_PAGE_LIMIT
    );

    QueryDescriptor::new(definition, as_key, account_id.is_some())
}

/// The app settings document.
pub fn build_settings_query() -> QueryDescriptor {
    let definition = QueryDefinition::new(SETTINGS_DOCTYPE).limit_by(1);
    QueryDescriptor::new(definition, SETTINGS_DOCTYPE.to_string(), true)
}
