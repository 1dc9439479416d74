//! Sensor read models.
//!
//! Two sensors are exposed to consumers: the number of nearby stations and
//! the minutes until the next departure. Their values and availability are
//! derived from the coordinator state; a [`SensorBoard`] subscribes to the
//! coordinator and keeps the latest readings.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::coordinator::{Coordinator, CoordinatorState, Listener};
use crate::domain::StationRecord;
use crate::fetch::HttpTransport;
use crate::metrics::{DepartureBoard, DepartureView, departure_list, next_departure_minutes};

/// Extra state for the stations-count sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationsCountAttributes {
    pub stations: Vec<StationRecord>,
    pub station_count: usize,
    pub last_update_success: bool,
    pub search_radius: u32,
    /// "lat, lon" with six decimals.
    pub coordinates: String,
}

/// Reading of the stations-count sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationsCountReading {
    pub name: &'static str,
    pub unit: &'static str,
    pub value: usize,
    /// Follows the most recent fetch outcome, even when cached data is shown.
    pub available: bool,
    /// Present only when there is data.
    pub attributes: Option<StationsCountAttributes>,
}

/// Extra state for the next-departure sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextDepartureAttributes {
    pub all_departures: Vec<DepartureView>,
    pub departure_count: usize,
    pub last_update_success: bool,
}

/// Reading of the next-departure sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextDepartureReading {
    pub name: &'static str,
    pub unit: &'static str,
    pub value: Option<i64>,
    /// Requires both a successful last fetch and data.
    pub available: bool,
    pub attributes: Option<NextDepartureAttributes>,
}

/// Read the stations-count sensor from a coordinator state.
pub fn stations_count(state: &CoordinatorState) -> StationsCountReading {
    let attributes = state
        .current
        .as_ref()
        .filter(|_| state.has_data())
        .map(|snapshot| StationsCountAttributes {
            stations: snapshot.stations().to_vec(),
            station_count: state.station_count(),
            last_update_success: state.last_success,
            search_radius: state.radius.meters(),
            coordinates: state.coordinate.to_string(),
        });

    StationsCountReading {
        name: "Stations Count",
        unit: "stations",
        value: state.station_count(),
        available: state.last_success,
        attributes,
    }
}

/// Read the next-departure sensor from a coordinator state.
pub fn next_departure(state: &CoordinatorState) -> NextDepartureReading {
    let snapshot = state.current.as_ref().filter(|_| state.has_data());

    let attributes = snapshot.map(|s| {
        let DepartureBoard { departures, total } = departure_list(s);
        NextDepartureAttributes {
            all_departures: departures,
            departure_count: total,
            last_update_success: state.last_success,
        }
    });

    NextDepartureReading {
        name: "Next Departure",
        unit: "min",
        value: snapshot.and_then(|s| next_departure_minutes(s)),
        available: state.last_success && state.has_data(),
        attributes,
    }
}

/// Latest readings of both sensors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReadings {
    pub stations_count: StationsCountReading,
    pub next_departure: NextDepartureReading,
    /// Departure board for the current snapshot (empty without data).
    pub board: DepartureBoard,
    /// Number of coordinator publishes seen.
    pub updates: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SensorReadings {
    fn from_state(state: &CoordinatorState, updates: u64) -> Self {
        Self {
            stations_count: stations_count(state),
            next_departure: next_departure(state),
            board: state
                .current
                .as_ref()
                .map(|s| departure_list(s))
                .unwrap_or_default(),
            updates,
            updated_at: state.last_polled_at,
        }
    }
}

/// Both sensors, kept current by a coordinator listener.
pub struct SensorBoard {
    readings: Arc<RwLock<SensorReadings>>,
    listener: Listener,
}

impl SensorBoard {
    /// Take initial readings and subscribe to `coordinator`.
    pub fn attach<T: HttpTransport>(coordinator: &Coordinator<T>) -> Self {
        let readings = Arc::new(RwLock::new(SensorReadings::from_state(
            &coordinator.state(),
            0,
        )));

        let listener: Listener = {
            let readings = Arc::clone(&readings);
            Arc::new(move |state: &CoordinatorState| {
                let mut guard = readings.write().unwrap_or_else(PoisonError::into_inner);
                let updates = guard.updates + 1;
                *guard = SensorReadings::from_state(state, updates);
            })
        };
        coordinator.add_listener(&listener);

        Self { readings, listener }
    }

    /// Unsubscribe from `coordinator`. Readings stop changing afterwards.
    pub fn detach<T: HttpTransport>(&self, coordinator: &Coordinator<T>) -> bool {
        coordinator.remove_listener(&self.listener)
    }

    /// Copy of the latest readings.
    pub fn readings(&self) -> SensorReadings {
        self.readings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for SensorBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorBoard")
            .field("readings", &self.readings())
            .finish_non_exhaustive()
    }
}
