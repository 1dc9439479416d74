//! Web layer for the transit monitor.
//!
//! Serves the sensor readings as JSON.

mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
