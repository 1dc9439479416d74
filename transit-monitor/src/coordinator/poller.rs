//! Scheduled polling.
//!
//! A single task drives the coordinator on a fixed interval. Ticks that
//! arrive while a poll is still running are skipped, and shutdown cancels
//! the task even mid-backoff. A cancelled poll puts the coordinator's status
//! back to what it was before that poll.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::fetch::HttpTransport;

use super::state::CoordinatorStatus;
use super::update::Coordinator;

/// Handle to a running poll task.
///
/// Dropping the handle aborts the task; [`PollerHandle::shutdown`] stops it
/// and waits for it to finish.
#[derive(Debug)]
pub struct PollerHandle {
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Stop polling and wait for the task to exit.
    ///
    /// An in-flight fetch or backoff sleep is abandoned.
    pub async fn shutdown(mut self) {
        let _ = self.stop.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        info!("poller stopped");
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Start polling `coordinator` every `period`.
///
/// If the coordinator has never polled, the first poll runs immediately;
/// otherwise (e.g. after [`Coordinator::first_refresh`]) the first poll
/// waits one period.
pub fn spawn_poller<T>(coordinator: Arc<Coordinator<T>>, period: Duration) -> PollerHandle
where
    T: HttpTransport + 'static,
{
    let (stop, mut stopped) = watch::channel(false);

    let start = if coordinator.status() == CoordinatorStatus::Idle {
        Instant::now()
    } else {
        Instant::now() + period
    };

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_secs = period.as_secs(), "poller started");

        loop {
            tokio::select! {
                _ = stopped.changed() => break,
                _ = interval.tick() => {}
            }

            debug!("poll tick");
            tokio::select! {
                _ = stopped.changed() => break,
                // Errors are logged by the coordinator and reflected in its state
                _ = coordinator.refresh() => {}
            }
        }
    });

    PollerHandle {
        stop,
        task: Some(task),
    }
}
