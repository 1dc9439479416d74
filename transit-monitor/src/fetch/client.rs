//! Stations API fetcher with endpoint fallback and retry.
//!
//! One logical fetch walks a list of city endpoints, nearest city first.
//! Each endpoint gets up to `max_retries + 1` attempts governed by the
//! [`RetryPolicy`]; the first parseable 200 response wins. Attempts are
//! strictly sequential, so at most one request is in flight per fetch.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::city::{City, CityCode, GAZETTEER, resolve_in};
use crate::domain::{Coordinate, SearchRadius, Snapshot, StationRecord};

use super::error::FetchError;
use super::policy::{RetryAction, RetryPolicy};
use super::transport::{HttpResponse, HttpTransport};

/// Default base URL for the stations API.
pub const DEFAULT_BASE_URL: &str = "https://transport-api.dzarlax.dev";

/// Default per-attempt timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default retries per endpoint.
const DEFAULT_MAX_RETRIES: u32 = 2;

/// Configuration for the station fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Per-attempt request timeout in seconds
    pub timeout_secs: u64,
    /// Retries per endpoint after the first attempt
    pub max_retries: u32,
    /// Cities to choose endpoints from, in fallback order
    pub gazetteer: Vec<City>,
}

impl FetcherConfig {
    /// Create a config pointing at the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            gazetteer: GAZETTEER.to_vec(),
        }
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set retries per endpoint.
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Replace the gazetteer (mostly for testing).
    pub fn with_gazetteer(mut self, cities: Vec<City>) -> Self {
        self.gazetteer = cities;
        self
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// One candidate endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub city: CityCode,
    pub url: String,
}

/// Fetches nearby stations from the stations API.
#[derive(Debug, Clone)]
pub struct StationFetcher<T> {
    transport: T,
    config: FetcherConfig,
    policy: RetryPolicy,
}

impl<T: HttpTransport> StationFetcher<T> {
    pub fn new(transport: T, config: FetcherConfig) -> Self {
        let policy = RetryPolicy::new(config.max_retries);
        Self {
            transport,
            config,
            policy,
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Candidate endpoints for a coordinate: nearest city first, then the
    /// rest of the gazetteer in order, without duplicate URLs.
    pub fn endpoints(&self, coordinate: Coordinate) -> Vec<Endpoint> {
        let nearest = resolve_in(
            &self.config.gazetteer,
            coordinate.latitude(),
            coordinate.longitude(),
        );

        let base = self.config.base_url.trim_end_matches('/');
        let mut endpoints: Vec<Endpoint> = Vec::with_capacity(self.config.gazetteer.len() + 1);
        let candidates =
            std::iter::once(nearest).chain(self.config.gazetteer.iter().map(|c| c.code));

        for city in candidates {
            let url = format!("{}/api/stations/{}/all", base, city.as_str());
            if !endpoints.iter().any(|e| e.url == url) {
                endpoints.push(Endpoint { city, url });
            }
        }
        endpoints
    }

    /// Fetch stations within `radius` of `coordinate`.
    ///
    /// Returns the first successful snapshot. If every endpoint fails, the
    /// error is the one recorded for the last endpoint tried.
    pub async fn fetch(
        &self,
        coordinate: Coordinate,
        radius: SearchRadius,
    ) -> Result<Snapshot, FetchError> {
        let query = [
            ("lat", coordinate.latitude().to_string()),
            ("lon", coordinate.longitude().to_string()),
            ("rad", radius.meters().to_string()),
        ];

        let mut last_error = None;
        for endpoint in self.endpoints(coordinate) {
            match self.fetch_endpoint(&endpoint, &query).await {
                Ok(stations) => {
                    debug!(
                        city = %endpoint.city,
                        stations = stations.len(),
                        "fetched stations"
                    );
                    return Ok(Snapshot::new(stations, endpoint.city, Utc::now()));
                }
                Err(err) => {
                    warn!(city = %endpoint.city, url = %endpoint.url, error = %err, "endpoint failed");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or(FetchError::AllEndpointsFailed))
    }

    /// Try one endpoint until it succeeds or the policy says to move on.
    async fn fetch_endpoint(
        &self,
        endpoint: &Endpoint,
        query: &[(&'static str, String)],
    ) -> Result<Vec<StationRecord>, FetchError> {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let mut attempt = 0;

        loop {
            let err = match self.transport.get(&endpoint.url, query, timeout).await {
                Ok(response) => match parse_response(response) {
                    Ok(stations) => return Ok(stations),
                    Err(err) => err,
                },
                Err(err) => err.into(),
            };

            match self.policy.action(&err, attempt) {
                RetryAction::Retry(delay) => {
                    debug!(
                        city = %endpoint.city,
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryAction::Advance => return Err(err),
            }
        }
    }
}

/// Turn a raw response into station records or a classified error.
fn parse_response(response: HttpResponse) -> Result<Vec<StationRecord>, FetchError> {
    if response.status != 200 {
        return Err(FetchError::from_status(response.status));
    }

    serde_json::from_str(&response.body).map_err(|e| {
        let body: String = response.body.chars().take(200).collect();
        FetchError::UnexpectedError(format!("invalid stations JSON: {e} (body: {body})"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::{Scripted, ScriptedTransport};

    fn belgrade() -> Coordinate {
        Coordinate::new(44.81, 20.46).unwrap()
    }

    fn novi_sad() -> Coordinate {
        Coordinate::new(45.26, 19.83).unwrap()
    }

    fn fetcher(transport: ScriptedTransport, max_retries: u32) -> StationFetcher<ScriptedTransport> {
        let config = FetcherConfig::new("http://api.test").with_max_retries(max_retries);
        StationFetcher::new(transport, config)
    }

    fn url(city: &str) -> String {
        format!("http://api.test/api/stations/{city}/all")
    }

    const ONE_STATION: &str = r#"[{"name": "Slavija", "vehicles": [{"lineNumber": "26", "lineName": "Dorćol", "secondsLeft": 120}]}]"#;

    #[test]
    fn config_builder() {
        let config = FetcherConfig::new("http://localhost:8080")
            .with_timeout(5)
            .with_max_retries(4);

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.max_retries, 4);
        assert_eq!(config.gazetteer.len(), GAZETTEER.len());
    }

    #[test]
    fn config_defaults() {
        let config = FetcherConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn endpoints_start_with_nearest_city() {
        let f = fetcher(ScriptedTransport::new(), 0);

        let urls: Vec<String> = f.endpoints(novi_sad()).into_iter().map(|e| e.url).collect();
        assert_eq!(urls, vec![url("ns"), url("bg"), url("nis")]);

        let urls: Vec<String> = f.endpoints(belgrade()).into_iter().map(|e| e.url).collect();
        assert_eq!(urls, vec![url("bg"), url("ns"), url("nis")]);
    }

    #[test]
    fn endpoints_never_duplicate() {
        let config = FetcherConfig::new("http://api.test/").with_gazetteer(vec![
            City::new("bg", "Belgrade", 44.8, 20.4),
            City::new("bg", "Belgrade again", 44.8, 20.4),
            City::new("ns", "Novi Sad", 45.2, 19.8),
        ]);
        let f = StationFetcher::new(ScriptedTransport::new(), config);

        let urls: Vec<String> = f.endpoints(belgrade()).into_iter().map(|e| e.url).collect();
        assert_eq!(urls, vec![url("bg"), url("ns")]);
    }

    #[tokio::test]
    async fn success_on_first_endpoint() {
        let transport = ScriptedTransport::new();
        transport.push(&url("bg"), Scripted::ok(ONE_STATION));
        let f = fetcher(transport.clone(), 2);

        let snapshot = f.fetch(belgrade(), SearchRadius::default()).await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.city().as_str(), "bg");
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn query_carries_coordinate_and_radius() {
        let transport = ScriptedTransport::new();
        transport.push(&url("bg"), Scripted::ok("[]"));
        let f = fetcher(transport.clone(), 0);

        f.fetch(belgrade(), SearchRadius::new(750).unwrap())
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(
            requests[0].query,
            vec![
                ("lat".to_string(), "44.81".to_string()),
                ("lon".to_string(), "20.46".to_string()),
                ("rad".to_string(), "750".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn empty_array_is_success() {
        let transport = ScriptedTransport::new();
        transport.push(&url("bg"), Scripted::ok("[]"));
        let f = fetcher(transport, 2);

        let snapshot = f.fetch(belgrade(), SearchRadius::default()).await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn negative_stations_between_keeps_the_endpoint() {
        let transport = ScriptedTransport::new();
        transport.push(
            &url("bg"),
            Scripted::ok(
                r#"[{"name": "A", "vehicles": [{"lineNumber": "26", "secondsLeft": 30, "stationsBetween": -1}]},
                    {"name": "B", "vehicles": []}]"#,
            ),
        );
        let f = fetcher(transport.clone(), 0);

        let snapshot = f.fetch(belgrade(), SearchRadius::default()).await.unwrap();
        assert_eq!(snapshot.city().as_str(), "bg");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.stations()[0].vehicles[0].stations_between, -1);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_retries_same_endpoint() {
        let transport = ScriptedTransport::new();
        transport.push(&url("bg"), Scripted::status(429));
        transport.push(&url("bg"), Scripted::status(429));
        transport.push(&url("bg"), Scripted::ok(ONE_STATION));
        let f = fetcher(transport.clone(), 2);

        let start = tokio::time::Instant::now();
        let snapshot = f.fetch(belgrade(), SearchRadius::default()).await.unwrap();

        assert_eq!(snapshot.city().as_str(), "bg");
        assert_eq!(transport.request_count(), 3);
        assert!(transport.requests().iter().all(|r| r.url == url("bg")));
        // Two backoff waits: 1s then 2s
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_advances_without_retry() {
        let transport = ScriptedTransport::new();
        transport.push(&url("bg"), Scripted::status(404));
        transport.push(&url("ns"), Scripted::ok(ONE_STATION));
        let f = fetcher(transport.clone(), 3);

        let start = tokio::time::Instant::now();
        let snapshot = f.fetch(belgrade(), SearchRadius::default()).await.unwrap();

        assert_eq!(snapshot.city().as_str(), "ns");
        let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec![url("bg"), url("ns")]);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn all_server_errors_exhaust_every_endpoint() {
        let transport = ScriptedTransport::new().with_fallback(Scripted::status(500));
        let config = FetcherConfig::new("http://api.test")
            .with_max_retries(1)
            .with_gazetteer(vec![
                City::new("bg", "Belgrade", 44.8125, 20.4612),
                City::new("ns", "Novi Sad", 45.2671, 19.8335),
            ]);
        let f = StationFetcher::new(transport.clone(), config);

        let result = f.fetch(belgrade(), SearchRadius::default()).await;

        assert_eq!(result, Err(FetchError::ServerError { status: 500 }));
        // 2 endpoints x (max_retries + 1) attempts
        assert_eq!(transport.request_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn last_endpoint_error_wins() {
        let transport = ScriptedTransport::new();
        transport.push(&url("bg"), Scripted::status(500));
        transport.push(&url("ns"), Scripted::status(404));
        transport.push(&url("nis"), Scripted::status(403));
        let f = fetcher(transport, 0);

        let result = f.fetch(belgrade(), SearchRadius::default()).await;
        assert_eq!(result, Err(FetchError::ClientError { status: 403 }));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_retries_after_one_second() {
        let transport = ScriptedTransport::new();
        transport.push(&url("bg"), Scripted::Timeout);
        transport.push(&url("bg"), Scripted::Timeout);
        transport.push(&url("bg"), Scripted::ok("[]"));
        let f = fetcher(transport.clone(), 2);

        let start = tokio::time::Instant::now();
        f.fetch(belgrade(), SearchRadius::default()).await.unwrap();

        assert_eq!(transport.request_count(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn network_errors_back_off_then_advance() {
        let transport = ScriptedTransport::new();
        transport.push(&url("bg"), Scripted::Network);
        transport.push(&url("bg"), Scripted::Network);
        transport.push(&url("ns"), Scripted::ok(ONE_STATION));
        let f = fetcher(transport.clone(), 1);

        let start = tokio::time::Instant::now();
        let snapshot = f.fetch(belgrade(), SearchRadius::default()).await.unwrap();

        assert_eq!(snapshot.city().as_str(), "ns");
        assert_eq!(transport.request_count(), 3);
        // Only one wait: the second failure exhausts the budget
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn malformed_body_advances_without_retry() {
        let transport = ScriptedTransport::new();
        transport.push(&url("bg"), Scripted::ok("{\"not\": \"an array\"}"));
        transport.push(&url("ns"), Scripted::ok("[]"));
        let f = fetcher(transport.clone(), 3);

        let snapshot = f.fetch(belgrade(), SearchRadius::default()).await.unwrap();
        assert_eq!(snapshot.city().as_str(), "ns");
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn unexpected_transport_error_advances() {
        let transport = ScriptedTransport::new().with_fallback(Scripted::Other);
        let f = fetcher(transport.clone(), 3);

        let result = f.fetch(belgrade(), SearchRadius::default()).await;
        assert!(matches!(result, Err(FetchError::UnexpectedError(_))));
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn empty_gazetteer_still_tries_default_city() {
        let transport = ScriptedTransport::new();
        transport.push(&url("bg"), Scripted::ok("[]"));
        let config = FetcherConfig::new("http://api.test").with_gazetteer(vec![]);
        let f = StationFetcher::new(transport, config);

        assert!(f.fetch(belgrade(), SearchRadius::default()).await.is_ok());
    }

    #[test]
    fn parse_rejects_non_200() {
        assert_eq!(
            parse_response(HttpResponse::new(201, "[]")),
            Err(FetchError::ClientError { status: 201 })
        );
    }
}
