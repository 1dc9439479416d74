//! HTTP route handlers.
//!
//! Handlers only read the latest published sensor readings; they never
//! trigger a fetch.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::metrics::DepartureBoard;
use crate::sensors::{NextDepartureReading, StationsCountReading};

use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sensors", get(sensors))
        .route("/api/departures", get(departures))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Both sensors.
#[derive(Debug, Serialize)]
struct SensorsResponse {
    stations_count: StationsCountReading,
    next_departure: NextDepartureReading,
}

async fn sensors(State(state): State<AppState>) -> Json<SensorsResponse> {
    let readings = state.sensors.readings();
    Json(SensorsResponse {
        stations_count: readings.stations_count,
        next_departure: readings.next_departure,
    })
}

/// The departure board for the current snapshot.
async fn departures(State(state): State<AppState>) -> Json<DepartureBoard> {
    Json(state.sensors.readings().board)
}
