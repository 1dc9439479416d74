//! Station and vehicle records as returned by the stations API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::city::CityCode;

/// Placeholder used when the API omits a name or line label.
const UNKNOWN: &str = "Unknown";

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Accept a label as a JSON string or number; `null` becomes "Unknown".
fn label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => unknown(),
    })
}

/// Accept any integer; `null` or a non-integer value becomes 0.
fn count_or_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_i64().unwrap_or(0))
}

/// One vehicle approaching a stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleArrival {
    /// Line number, e.g. "26" or "E2".
    #[serde(default = "unknown", deserialize_with = "label")]
    pub line_number: String,

    /// Line name, which the API uses for the destination.
    #[serde(default = "unknown", deserialize_with = "label")]
    pub line_name: String,

    /// Seconds until the vehicle reaches the stop, if the API knows.
    #[serde(default)]
    pub seconds_left: Option<i64>,

    /// Stops between the vehicle and this one.
    #[serde(default, deserialize_with = "count_or_zero")]
    pub stations_between: i64,
}

impl VehicleArrival {
    pub fn new(line_number: impl Into<String>, line_name: impl Into<String>) -> Self {
        Self {
            line_number: line_number.into(),
            line_name: line_name.into(),
            seconds_left: None,
            stations_between: 0,
        }
    }

    pub fn with_seconds_left(mut self, seconds: i64) -> Self {
        self.seconds_left = Some(seconds);
        self
    }

    pub fn with_stations_between(mut self, n: i64) -> Self {
        self.stations_between = n;
        self
    }
}

/// One transit stop and its imminent arrivals.
///
/// Fields the API sends beyond `name` and `vehicles` (ids, distance,
/// coordinates) are kept verbatim in `extra` so they can be passed on to
/// consumers untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    #[serde(default = "unknown", deserialize_with = "label")]
    pub name: String,

    /// Arrivals in API order. May be empty.
    #[serde(default)]
    pub vehicles: Vec<VehicleArrival>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StationRecord {
    pub fn new(name: impl Into<String>, vehicles: Vec<VehicleArrival>) -> Self {
        Self {
            name: name.into(),
            vehicles,
            extra: serde_json::Map::new(),
        }
    }
}

/// The result of one successful fetch.
///
/// Immutable once built; the coordinator shares it as `Arc<Snapshot>` and
/// replaces the reference instead of editing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    stations: Vec<StationRecord>,
    city: CityCode,
    fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(stations: Vec<StationRecord>, city: CityCode, fetched_at: DateTime<Utc>) -> Self {
        Self {
            stations,
            city,
            fetched_at,
        }
    }

    /// Stations in API order.
    pub fn stations(&self) -> &[StationRecord] {
        &self.stations
    }

    /// City whose endpoint answered.
    pub fn city(&self) -> CityCode {
        self.city
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
