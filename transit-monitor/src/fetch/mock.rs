//! Scripted transport for testing without network access.
//!
//! Responses are queued per URL and served in order. When a URL's queue is
//! empty the fallback response is used, which defaults to a network error.
//! An optional latency keeps each request in flight for a while before it
//! answers.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::error::TransportError;
use super::transport::{HttpResponse, HttpTransport};

/// One scripted outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    /// An HTTP response with a status and body.
    Response(HttpResponse),
    /// The request times out.
    Timeout,
    /// The connection fails.
    Network,
    /// Some other transport failure.
    Other,
}

impl Scripted {
    /// A 200 response with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Scripted::Response(HttpResponse::new(200, body))
    }

    /// An empty response with the given status.
    pub fn status(status: u16) -> Self {
        Scripted::Response(HttpResponse::new(status, ""))
    }

    fn into_result(self) -> Result<HttpResponse, TransportError> {
        match self {
            Scripted::Response(r) => Ok(r),
            Scripted::Timeout => Err(TransportError::Timeout),
            Scripted::Network => Err(TransportError::Network("connection refused".into())),
            Scripted::Other => Err(TransportError::Other("scripted failure".into())),
        }
    }
}

/// A request the transport has seen.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub timeout: Duration,
}

#[derive(Debug, Default)]
struct Script {
    queues: HashMap<String, VecDeque<Scripted>>,
    fallback: Option<Scripted>,
    latency: Option<Duration>,
    log: Vec<RecordedRequest>,
}

/// Transport that replays queued responses.
///
/// Clones share the same script and request log, so a test can keep one
/// handle while the fetcher owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Response used once a URL's queue is empty.
    pub fn with_fallback(self, fallback: Scripted) -> Self {
        self.lock().fallback = Some(fallback);
        self
    }

    /// Hold every request for `latency` before answering.
    ///
    /// The request is logged when it starts, so a test can see it in flight.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = Some(latency);
        self
    }

    /// Queue a response for `url`.
    pub fn push(&self, url: &str, outcome: Scripted) {
        self.lock()
            .queues
            .entry(url.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Replace the fallback response.
    pub fn set_fallback(&self, fallback: Scripted) {
        self.lock().fallback = Some(fallback);
    }

    /// All requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().log.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().log.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HttpTransport for ScriptedTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(&'static str, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let (outcome, latency) = {
            let mut script = self.lock();
            script.log.push(RecordedRequest {
                url: url.to_string(),
                query: query
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), v.clone()))
                    .collect(),
                timeout,
            });
            let queued = script.queues.get_mut(url).and_then(VecDeque::pop_front);
            let outcome = queued
                .or_else(|| script.fallback.clone())
                .unwrap_or(Scripted::Network);
            (outcome, script.latency)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        outcome.into_result()
    }
}
