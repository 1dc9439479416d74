//! Retry and backoff policy.
//!
//! Every failure class maps to a [`Backoff`] rule in one table
//! ([`RetryPolicy::backoff_for`]); [`RetryPolicy::action`] combines that
//! rule with the attempt number and retry budget.

use std::time::Duration;

use super::error::FetchError;

/// How a failure class is retried on the same endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Give up on this endpoint immediately.
    None,
    /// Wait `2^attempt` seconds (attempt is 0-indexed).
    Exponential,
    /// Wait a fixed delay.
    Fixed(Duration),
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Sleep, then try the same endpoint again.
    Retry(Duration),
    /// Record the failure and move to the next endpoint.
    Advance,
}

/// Per-endpoint retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; each endpoint gets `max_retries + 1` attempts.
    pub max_retries: u32,
    /// Delay before retrying a timed-out request.
    pub timeout_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            timeout_delay: Duration::from_secs(1),
        }
    }

    /// The backoff rule for a failure class.
    pub fn backoff_for(&self, error: &FetchError) -> Backoff {
        match error {
            FetchError::RateLimited
            | FetchError::ServerError { .. }
            | FetchError::NetworkError(_) => Backoff::Exponential,
            FetchError::Timeout => Backoff::Fixed(self.timeout_delay),
            FetchError::NotFound
            | FetchError::ClientError { .. }
            | FetchError::UnexpectedError(_)
            | FetchError::AllEndpointsFailed
            | FetchError::NoDataAvailable(_) => Backoff::None,
        }
    }

    /// Decide what follows failed attempt number `attempt` (0-indexed).
    pub fn action(&self, error: &FetchError, attempt: u32) -> RetryAction {
        if attempt >= self.max_retries {
            return RetryAction::Advance;
        }
        match self.backoff_for(error) {
            Backoff::None => RetryAction::Advance,
            Backoff::Exponential => RetryAction::Retry(exponential_delay(attempt)),
            Backoff::Fixed(delay) => RetryAction::Retry(delay),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}

fn exponential_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt))
}
