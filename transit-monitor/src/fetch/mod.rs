//! Stations API client.
//!
//! This module fetches nearby stations for a coordinate. It hides the API's
//! per-city partitioning behind one call:
//! - endpoints are ordered nearest city first, then the remaining cities
//! - every failure is classified and handled by a single [`RetryPolicy`]
//! - the transport is a trait so tests can script responses ([`mock`])

mod client;
mod error;
pub mod mock;
mod policy;
mod transport;

pub use client::{DEFAULT_BASE_URL, Endpoint, FetcherConfig, StationFetcher};
pub use error::{FetchError, TransportError};
pub use policy::{Backoff, RetryAction, RetryPolicy};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
