//! Application state for the web layer.

use std::sync::Arc;

use crate::sensors::SensorBoard;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Sensor readings, kept current by the coordinator
    pub sensors: Arc<SensorBoard>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(sensors: Arc<SensorBoard>) -> Self {
        Self { sensors }
    }
}
