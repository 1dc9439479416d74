//! Fetch error types.

/// Why a fetch (or a single attempt within one) failed.
///
/// Per-attempt failures are classified into one of the first seven
/// variants; [`RetryPolicy`](super::RetryPolicy) decides from the variant
/// whether to back off and retry or move on to the next endpoint.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// HTTP 429
    #[error("rate limited by stations API")]
    RateLimited,

    /// HTTP 404
    #[error("stations endpoint not found")]
    NotFound,

    /// HTTP 5xx
    #[error("stations API server error {status}")]
    ServerError { status: u16 },

    /// Any other non-200 status
    #[error("stations API rejected request with status {status}")]
    ClientError { status: u16 },

    /// The request did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,

    /// Connection or transport failure
    #[error("network error: {0}")]
    NetworkError(String),

    /// Anything else, including an unparseable 200 body
    #[error("unexpected error: {0}")]
    UnexpectedError(String),

    /// No endpoint was tried, so no specific failure was recorded
    #[error("all endpoints failed")]
    AllEndpointsFailed,

    /// The fetch failed and there is no cached snapshot to serve
    #[error("no data available: {0}")]
    NoDataAvailable(Box<FetchError>),
}

impl FetchError {
    /// Classify a non-200 HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => FetchError::RateLimited,
            404 => FetchError::NotFound,
            s if s >= 500 => FetchError::ServerError { status: s },
            s => FetchError::ClientError { status: s },
        }
    }
}

/// Outcome of a transport call that never produced an HTTP status.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("timed out")]
    Timeout,

    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}

impl From<TransportError> for FetchError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => FetchError::Timeout,
            TransportError::Network(msg) => FetchError::NetworkError(msg),
            TransportError::Other(msg) => FetchError::UnexpectedError(msg),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() || err.is_request() || err.is_body() {
            TransportError::Network(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}
