//! Published coordinator state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Coordinate, SearchRadius, Snapshot};

/// Where the coordinator is in its poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorStatus {
    /// No poll has started yet.
    Idle,
    /// A fetch is in flight.
    Polling,
    /// The last poll has finished, successfully or not.
    Settled,
}

/// One immutable view of the coordinator.
///
/// A new value is built for every transition and swapped in whole, so a
/// reader holding an `Arc<CoordinatorState>` always sees a consistent set
/// of fields.
#[derive(Debug, Clone)]
pub struct CoordinatorState {
    pub coordinate: Coordinate,
    pub radius: SearchRadius,
    pub status: CoordinatorStatus,

    /// Snapshot served to consumers; may be the last-known-good one after a
    /// failed poll.
    pub current: Option<Arc<Snapshot>>,

    /// Most recent successful snapshot. Only a newer success replaces it.
    pub last_known_good: Option<Arc<Snapshot>>,

    /// Whether the most recent fetch itself succeeded.
    pub last_success: bool,

    /// Error from the most recent fetch, if it failed.
    pub last_error: Option<String>,

    /// When the most recent poll finished.
    pub last_polled_at: Option<DateTime<Utc>>,
}

impl CoordinatorState {
    pub(super) fn idle(coordinate: Coordinate, radius: SearchRadius) -> Self {
        Self {
            coordinate,
            radius,
            status: CoordinatorStatus::Idle,
            current: None,
            last_known_good: None,
            last_success: false,
            last_error: None,
            last_polled_at: None,
        }
    }

    /// Number of stations in the current snapshot, 0 without one.
    pub fn station_count(&self) -> usize {
        self.current.as_ref().map_or(0, |s| s.len())
    }

    /// True when a current snapshot exists and is non-empty.
    pub fn has_data(&self) -> bool {
        self.current.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// True when `current` is an older snapshot served after a failed fetch.
    pub fn is_stale(&self) -> bool {
        !self.last_success && self.current.is_some()
    }
}
