//! The update coordinator: one fetch-and-publish cycle at a time.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::{Coordinate, SearchRadius, Snapshot};
use crate::fetch::{FetchError, HttpTransport, StationFetcher};

use super::listeners::{Listener, Listeners};
use super::state::{CoordinatorState, CoordinatorStatus};

/// How a poll ended when data is available.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The fetch succeeded and this snapshot is now current.
    Fresh(Arc<Snapshot>),
    /// The fetch failed; the last-known-good snapshot is served instead.
    Stale {
        snapshot: Arc<Snapshot>,
        error: FetchError,
    },
}

impl PollOutcome {
    pub fn snapshot(&self) -> &Arc<Snapshot> {
        match self {
            PollOutcome::Fresh(s) => s,
            PollOutcome::Stale { snapshot, .. } => snapshot,
        }
    }
}

/// Polls the stations API for one coordinate and radius.
///
/// Owns all mutable state for its location. State is published by swapping
/// an `Arc<CoordinatorState>`, so readers on other tasks never observe a
/// half-applied update.
pub struct Coordinator<T> {
    fetcher: StationFetcher<T>,
    coordinate: Coordinate,
    radius: SearchRadius,
    state: RwLock<Arc<CoordinatorState>>,
    listeners: Listeners,
    /// Held for the duration of a poll; a second poll waits its turn.
    in_flight: Mutex<()>,
}

impl<T: HttpTransport> Coordinator<T> {
    pub fn new(fetcher: StationFetcher<T>, coordinate: Coordinate, radius: SearchRadius) -> Self {
        Self {
            fetcher,
            coordinate,
            radius,
            state: RwLock::new(Arc::new(CoordinatorState::idle(coordinate, radius))),
            listeners: Listeners::new(),
            in_flight: Mutex::new(()),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn radius(&self) -> SearchRadius {
        self.radius
    }

    pub fn fetcher(&self) -> &StationFetcher<T> {
        &self.fetcher
    }

    /// The current published state.
    pub fn state(&self) -> Arc<CoordinatorState> {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// The snapshot consumers should read, possibly stale.
    pub fn current_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.state().current.clone()
    }

    /// Whether the most recent fetch succeeded.
    pub fn last_success(&self) -> bool {
        self.state().last_success
    }

    pub fn station_count(&self) -> usize {
        self.state().station_count()
    }

    pub fn has_data(&self) -> bool {
        self.state().has_data()
    }

    pub fn status(&self) -> CoordinatorStatus {
        self.state().status
    }

    /// Register a listener; see [`Listeners::add`].
    pub fn add_listener(&self, listener: &Listener) -> bool {
        self.listeners.add(listener)
    }

    /// Unregister a listener; see [`Listeners::remove`].
    pub fn remove_listener(&self, listener: &Listener) -> bool {
        self.listeners.remove(listener)
    }

    /// Run the first poll during setup.
    ///
    /// A failure is logged and returned but leaves the coordinator usable:
    /// it stays degraded until a scheduled poll succeeds.
    pub async fn first_refresh(&self) -> Result<PollOutcome, FetchError> {
        info!(
            coordinate = %self.coordinate,
            radius = %self.radius,
            "running first refresh"
        );
        let result = self.refresh().await;
        if let Err(err) = &result {
            error!(error = %err, "initial fetch failed, will retry on schedule");
        }
        result
    }

    /// Run one poll: fetch, apply the cache policy, publish, notify.
    ///
    /// Concurrent calls are serialized; a call made while another poll is in
    /// flight waits for it and then polls again.
    ///
    /// If the returned future is dropped mid-poll, the status goes back to
    /// what it was before the poll started.
    pub async fn refresh(&self) -> Result<PollOutcome, FetchError> {
        let _in_flight = self.in_flight.lock().await;

        let before = self.status();
        self.publish(|prev| CoordinatorState {
            status: CoordinatorStatus::Polling,
            ..prev.clone()
        });
        let mut cancelled = CancelGuard {
            state: &self.state,
            restore: Some(before),
        };

        debug!(
            coordinate = %self.coordinate,
            radius = %self.radius,
            "polling stations"
        );
        let fetched = self.fetcher.fetch(self.coordinate, self.radius).await;
        let now = Utc::now();

        let (next, result) = {
            let prev = self.state();
            match fetched {
                Ok(snapshot) => {
                    let snapshot = Arc::new(snapshot);
                    debug!(stations = snapshot.len(), "poll succeeded");
                    let next = CoordinatorState {
                        status: CoordinatorStatus::Settled,
                        current: Some(Arc::clone(&snapshot)),
                        last_known_good: Some(Arc::clone(&snapshot)),
                        last_success: true,
                        last_error: None,
                        last_polled_at: Some(now),
                        ..(*prev).clone()
                    };
                    (next, Ok(PollOutcome::Fresh(snapshot)))
                }
                Err(err) => match prev.last_known_good.clone() {
                    Some(cached) => {
                        warn!(
                            error = %err,
                            cached_at = %cached.fetched_at(),
                            "fetch failed, serving last-known-good snapshot"
                        );
                        let next = CoordinatorState {
                            status: CoordinatorStatus::Settled,
                            current: Some(Arc::clone(&cached)),
                            last_success: false,
                            last_error: Some(err.to_string()),
                            last_polled_at: Some(now),
                            ..(*prev).clone()
                        };
                        let outcome = PollOutcome::Stale {
                            snapshot: cached,
                            error: err,
                        };
                        (next, Ok(outcome))
                    }
                    None => {
                        error!(error = %err, "fetch failed and no cached data is available");
                        let next = CoordinatorState {
                            status: CoordinatorStatus::Settled,
                            current: None,
                            last_success: false,
                            last_error: Some(err.to_string()),
                            last_polled_at: Some(now),
                            ..(*prev).clone()
                        };
                        (next, Err(FetchError::NoDataAvailable(Box::new(err))))
                    }
                },
            }
        };

        cancelled.restore = None;
        let published = self.publish(|_| next);
        self.listeners.notify(&published);
        result
    }

    fn publish(
        &self,
        update: impl FnOnce(&CoordinatorState) -> CoordinatorState,
    ) -> Arc<CoordinatorState> {
        swap_state(&self.state, update)
    }
}

/// Swap in a new state derived from the current one.
fn swap_state(
    state: &RwLock<Arc<CoordinatorState>>,
    update: impl FnOnce(&CoordinatorState) -> CoordinatorState,
) -> Arc<CoordinatorState> {
    let mut guard = state.write().unwrap_or_else(PoisonError::into_inner);
    let next = Arc::new(update(&guard));
    *guard = Arc::clone(&next);
    next
}

/// Undoes the `Polling` status when a poll is dropped before it settles.
struct CancelGuard<'a> {
    state: &'a RwLock<Arc<CoordinatorState>>,
    restore: Option<CoordinatorStatus>,
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        if let Some(status) = self.restore.take() {
            debug!(?status, "poll cancelled");
            swap_state(self.state, |prev| CoordinatorState {
                status,
                ..prev.clone()
            });
        }
    }
}

impl<T> std::fmt::Debug for Coordinator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("coordinate", &self.coordinate)
            .field("radius", &self.radius)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}
