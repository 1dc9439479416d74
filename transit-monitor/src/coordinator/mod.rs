//! Update coordinator.
//!
//! Owns the polling schedule and the cache policy for one location:
//! - a successful fetch becomes both the current and last-known-good snapshot
//! - a failed fetch falls back to the last-known-good snapshot if there is one
//! - every poll, good or bad, is published to listeners

mod listeners;
mod poller;
mod state;
mod update;

pub use listeners::{Listener, Listeners};
pub use poller::{PollerHandle, spawn_poller};
pub use state::{CoordinatorState, CoordinatorStatus};
pub use update::{Coordinator, PollOutcome};
