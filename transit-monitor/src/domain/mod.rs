//! Domain types for the transit monitor.
//!
//! Location values are validated at construction, so anything holding a
//! `Coordinate` or `SearchRadius` can trust it. Station records mirror the
//! stations API and are tolerant of missing fields.

mod error;
mod location;
mod station;

pub use error::ConfigError;
pub use location::{Coordinate, SearchRadius};
pub use station::{Snapshot, StationRecord, VehicleArrival};
