//! Nearest-city lookup.
//!
//! The stations API is partitioned by city (`/api/stations/{city}/all`).
//! We pick the city whose reference point is closest to the configured
//! coordinate and try it first; the rest of the gazetteer serves as
//! fallback, in gazetteer order.
//!
//! Distance is plain Euclidean distance in degree space. This is a
//! best-effort heuristic for choosing an endpoint, not a geodesic.

use std::fmt;

use serde::Serialize;

/// Short city code used in API paths, e.g. `bg`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CityCode(&'static str);

impl CityCode {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for CityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CityCode({})", self.0)
    }
}

impl fmt::Display for CityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A gazetteer entry: a city code and its reference point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct City {
    pub code: CityCode,
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

impl City {
    pub const fn new(code: &'static str, name: &'static str, latitude: f64, longitude: f64) -> Self {
        Self {
            code: CityCode::new(code),
            name,
            latitude,
            longitude,
        }
    }

    /// Squared degree-space distance; ordering is all we need.
    fn distance_sq(&self, latitude: f64, longitude: f64) -> f64 {
        let dlat = self.latitude - latitude;
        let dlon = self.longitude - longitude;
        dlat * dlat + dlon * dlon
    }
}

/// Cities served by the stations API. Order doubles as fallback order.
pub const GAZETTEER: &[City] = &[
    City::new("bg", "Belgrade", 44.8125, 20.4612),
    City::new("ns", "Novi Sad", 45.2671, 19.8335),
    City::new("nis", "Niš", 43.3209, 21.8958),
];

/// Resolve a coordinate against the default [`GAZETTEER`].
///
/// # Examples
///
/// ```
/// use transit_monitor::city::resolve;
///
/// assert_eq!(resolve(45.25, 19.85).as_str(), "ns");
/// assert_eq!(resolve(44.80, 20.45).as_str(), "bg");
/// ```
pub fn resolve(latitude: f64, longitude: f64) -> CityCode {
    resolve_in(GAZETTEER, latitude, longitude)
}

/// Resolve a coordinate against a custom gazetteer.
///
/// Ties go to the earlier entry. Never fails: non-finite input or an
/// empty gazetteer yields the first entry (or the first default entry).
pub fn resolve_in(gazetteer: &[City], latitude: f64, longitude: f64) -> CityCode {
    let Some(first) = gazetteer.first().or(GAZETTEER.first()) else {
        return CityCode::new("bg");
    };

    let mut best = first;
    let mut best_distance = first.distance_sq(latitude, longitude);
    for city in gazetteer.iter().skip(1) {
        let d = city.distance_sq(latitude, longitude);
        // Strict comparison keeps the first minimum; NaN never wins.
        if d < best_distance {
            best = city;
            best_distance = d;
        }
    }
    best.code
}
