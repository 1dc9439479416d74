//! Validated location types: where to search and how far.

use std::fmt;

use serde::Serialize;

use super::error::ConfigError;

/// A point on the globe in signed decimal degrees.
///
/// Latitude is guaranteed to be in `[-90, 90]` and longitude in
/// `[-180, 180]`; both are finite.
///
/// # Examples
///
/// ```
/// use transit_monitor::domain::Coordinate;
///
/// let belgrade = Coordinate::new(44.8125, 20.4612).unwrap();
/// assert_eq!(belgrade.latitude(), 44.8125);
///
/// assert!(Coordinate::new(91.0, 0.0).is_err());
/// assert!(Coordinate::new(0.0, -180.5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting out-of-range or non-finite values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ConfigError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ConfigError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ConfigError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Search radius around a [`Coordinate`], in meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SearchRadius(u32);

impl SearchRadius {
    pub const MIN: u32 = 100;
    pub const MAX: u32 = 20_000;

    /// Create a radius, rejecting values outside `[MIN, MAX]`.
    pub fn new(meters: u32) -> Result<Self, ConfigError> {
        if !(Self::MIN..=Self::MAX).contains(&meters) {
            return Err(ConfigError::Radius(meters));
        }
        Ok(Self(meters))
    }

    pub fn meters(&self) -> u32 {
        self.0
    }
}

impl Default for SearchRadius {
    fn default() -> Self {
        Self(1000)
    }
}

impl fmt::Display for SearchRadius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.0)
    }
}
