//! Runtime settings.
//!
//! Settings come from `TRANSIT_*` environment variables. Location values
//! are validated into domain types here, so the rest of the program never
//! sees an out-of-range coordinate or radius.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::{ConfigError, Coordinate, SearchRadius};
use crate::fetch::{DEFAULT_BASE_URL, FetcherConfig};

/// Default poll interval.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default address for the HTTP read surface.
const DEFAULT_LISTEN_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 3000);

pub const LATITUDE: &str = "TRANSIT_LATITUDE";
pub const LONGITUDE: &str = "TRANSIT_LONGITUDE";
pub const SEARCH_RADIUS: &str = "TRANSIT_SEARCH_RADIUS";
/// Older spelling of [`SEARCH_RADIUS`], still accepted.
pub const SEARCH_RADIUS_LEGACY: &str = "TRANSIT_SEARCH_RAD";
pub const POLL_INTERVAL_SECS: &str = "TRANSIT_POLL_INTERVAL_SECS";
pub const BASE_URL: &str = "TRANSIT_BASE_URL";
pub const TIMEOUT_SECS: &str = "TRANSIT_TIMEOUT_SECS";
pub const MAX_RETRIES: &str = "TRANSIT_MAX_RETRIES";
pub const LISTEN_ADDR: &str = "TRANSIT_LISTEN_ADDR";

/// Everything needed to run the monitor.
#[derive(Debug, Clone)]
pub struct Settings {
    pub coordinate: Coordinate,
    pub radius: SearchRadius,
    pub poll_interval: Duration,
    pub fetcher: FetcherConfig,
    pub listen_addr: SocketAddr,
}

impl Settings {
    /// Create settings for a location with defaults for everything else.
    pub fn new(coordinate: Coordinate, radius: SearchRadius) -> Self {
        Self {
            coordinate,
            radius,
            poll_interval: DEFAULT_POLL_INTERVAL,
            fetcher: FetcherConfig::default(),
            listen_addr: SocketAddr::from(DEFAULT_LISTEN_ADDR),
        }
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the fetcher configuration.
    pub fn with_fetcher(mut self, fetcher: FetcherConfig) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Set the listen address.
    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let latitude: f64 = required(&get, LATITUDE)?;
        let longitude: f64 = required(&get, LONGITUDE)?;
        let coordinate = Coordinate::new(latitude, longitude)?;

        let radius = match parse_opt::<u32>(&get, SEARCH_RADIUS)? {
            Some(m) => SearchRadius::new(m)?,
            None => match parse_opt::<u32>(&get, SEARCH_RADIUS_LEGACY)? {
                Some(m) => SearchRadius::new(m)?,
                None => SearchRadius::default(),
            },
        };

        let mut settings = Settings::new(coordinate, radius);

        if let Some(secs) = parse_opt::<u64>(&get, POLL_INTERVAL_SECS)? {
            settings.poll_interval = Duration::from_secs(at_least_one(POLL_INTERVAL_SECS, secs)?);
        }

        let base_url = get(BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut fetcher = FetcherConfig::new(base_url.trim());
        if let Some(secs) = parse_opt::<u64>(&get, TIMEOUT_SECS)? {
            fetcher = fetcher.with_timeout(at_least_one(TIMEOUT_SECS, secs)?);
        }
        if let Some(n) = parse_opt::<u32>(&get, MAX_RETRIES)? {
            fetcher = fetcher.with_max_retries(n);
        }
        settings.fetcher = fetcher;

        if let Some(addr) = parse_opt::<SocketAddr>(&get, LISTEN_ADDR)? {
            settings.listen_addr = addr;
        }

        Ok(settings)
    }
}

fn parse_opt<V>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<V>, ConfigError>
where
    V: FromStr,
    V::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| {
            raw.trim().parse::<V>().map_err(|e| ConfigError::Invalid {
                key,
                message: e.to_string(),
            })
        })
        .transpose()
}

fn required<V>(get: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<V, ConfigError>
where
    V: FromStr,
    V::Err: std::fmt::Display,
{
    parse_opt(get, key)?.ok_or(ConfigError::Missing(key))
}

fn at_least_one(key: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            message: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn minimal_settings_use_defaults() {
        let s = load(&[(LATITUDE, "44.81"), (LONGITUDE, "20.46")]).unwrap();
        assert_eq!(s.coordinate.latitude(), 44.81);
        assert_eq!(s.radius.meters(), 1000);
        assert_eq!(s.poll_interval, Duration::from_secs(30));
        assert_eq!(s.fetcher.base_url, DEFAULT_BASE_URL);
        assert_eq!(s.fetcher.timeout_secs, 10);
        assert_eq!(s.fetcher.max_retries, 2);
        assert_eq!(s.listen_addr.to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn all_settings() {
        let s = load(&[
            (LATITUDE, "45.25"),
            (LONGITUDE, "19.84"),
            (SEARCH_RADIUS, "2500"),
            (POLL_INTERVAL_SECS, "60"),
            (BASE_URL, "http://localhost:9000"),
            (TIMEOUT_SECS, "5"),
            (MAX_RETRIES, "0"),
            (LISTEN_ADDR, "0.0.0.0:8080"),
        ])
        .unwrap();

        assert_eq!(s.radius.meters(), 2500);
        assert_eq!(s.poll_interval, Duration::from_secs(60));
        assert_eq!(s.fetcher.base_url, "http://localhost:9000");
        assert_eq!(s.fetcher.timeout_secs, 5);
        assert_eq!(s.fetcher.max_retries, 0);
        assert_eq!(s.listen_addr.port(), 8080);
    }

    #[test]
    fn legacy_radius_key() {
        let s = load(&[(LATITUDE, "0"), (LONGITUDE, "0"), (SEARCH_RADIUS_LEGACY, "300")]).unwrap();
        assert_eq!(s.radius.meters(), 300);

        let s = load(&[
            (LATITUDE, "0"),
            (LONGITUDE, "0"),
            (SEARCH_RADIUS, "400"),
            (SEARCH_RADIUS_LEGACY, "300"),
        ])
        .unwrap();
        assert_eq!(s.radius.meters(), 400);
    }

    #[test]
    fn missing_latitude() {
        let err = load(&[(LONGITUDE, "20.46")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing(LATITUDE));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let err = load(&[(LATITUDE, "  "), (LONGITUDE, "20.46")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing(LATITUDE));
    }

    #[test]
    fn out_of_range_values() {
        assert_eq!(
            load(&[(LATITUDE, "95"), (LONGITUDE, "0")]).unwrap_err(),
            ConfigError::Latitude(95.0)
        );
        assert_eq!(
            load(&[(LATITUDE, "0"), (LONGITUDE, "0"), (SEARCH_RADIUS, "50")]).unwrap_err(),
            ConfigError::Radius(50)
        );
    }

    #[test]
    fn unparseable_values() {
        let err = load(&[(LATITUDE, "north"), (LONGITUDE, "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: LATITUDE, .. }));

        let err = load(&[(LATITUDE, "0"), (LONGITUDE, "0"), (MAX_RETRIES, "-1")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: MAX_RETRIES, .. }));
    }

    #[test]
    fn zero_interval_rejected() {
        let err = load(&[(LATITUDE, "0"), (LONGITUDE, "0"), (POLL_INTERVAL_SECS, "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: POLL_INTERVAL_SECS, .. }));
    }

    #[test]
    fn builder() {
        let s = Settings::new(Coordinate::new(1.0, 2.0).unwrap(), SearchRadius::default())
            .with_poll_interval(Duration::from_secs(5))
            .with_fetcher(FetcherConfig::new("http://x").with_max_retries(7))
            .with_listen_addr("127.0.0.1:4000".parse().unwrap());
        assert_eq!(s.poll_interval, Duration::from_secs(5));
        assert_eq!(s.fetcher.max_retries, 7);
        assert_eq!(s.listen_addr.port(), 4000);
    }
}
