//! Metrics derived from a snapshot.
//!
//! Pure functions; the coordinator never calls these, consumers do on read.

use serde::Serialize;

use crate::domain::Snapshot;

/// Maximum departures returned by [`departure_list`].
pub const DEPARTURE_LIMIT: usize = 10;

/// Whole minutes until arrival, never less than 1.
///
/// Imminent vehicles show as "1 min" rather than "0 min".
///
/// ```
/// use transit_monitor::metrics::departure_minutes;
///
/// assert_eq!(departure_minutes(45), 1);
/// assert_eq!(departure_minutes(90), 1);
/// assert_eq!(departure_minutes(125), 2);
/// ```
pub fn departure_minutes(seconds_left: i64) -> i64 {
    (seconds_left / 60).max(1)
}

/// Minutes until the soonest vehicle at any station.
///
/// Vehicles without a `seconds_left` are ignored. Returns `None` when no
/// vehicle has one.
pub fn next_departure_minutes(snapshot: &Snapshot) -> Option<i64> {
    snapshot
        .stations()
        .iter()
        .flat_map(|s| &s.vehicles)
        .filter_map(|v| v.seconds_left)
        .map(departure_minutes)
        .min()
}

/// One row of the departure board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartureView {
    pub station: String,
    pub line: String,
    pub destination: String,
    pub minutes: i64,
    pub stations_between: i64,
}

/// Soonest departures plus the total number that qualified.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DepartureBoard {
    /// At most [`DEPARTURE_LIMIT`] rows, soonest first.
    pub departures: Vec<DepartureView>,
    /// Count before truncation.
    pub total: usize,
}

/// Every vehicle with a known arrival time, soonest first, truncated to
/// [`DEPARTURE_LIMIT`].
///
/// The sort is stable: rows with equal minutes keep station order, then
/// vehicle order within the station.
pub fn departure_list(snapshot: &Snapshot) -> DepartureBoard {
    let mut departures: Vec<DepartureView> = snapshot
        .stations()
        .iter()
        .flat_map(|station| {
            station.vehicles.iter().filter_map(move |v| {
                v.seconds_left.map(|secs| DepartureView {
                    station: station.name.clone(),
                    line: v.line_number.clone(),
                    destination: v.line_name.clone(),
                    minutes: departure_minutes(secs),
                    stations_between: v.stations_between,
                })
            })
        })
        .collect();

    departures.sort_by_key(|d| d.minutes);
    let total = departures.len();
    departures.truncate(DEPARTURE_LIMIT);

    DepartureBoard { departures, total }
}
