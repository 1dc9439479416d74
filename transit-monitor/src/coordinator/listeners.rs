//! Observer list for coordinator updates.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::state::CoordinatorState;

/// A callback run after every poll. Listeners run synchronously on the
/// polling task and must hand slow work off themselves.
pub type Listener = Arc<dyn Fn(&CoordinatorState) + Send + Sync>;

/// Listeners in registration order, identified by their `Arc` allocation.
#[derive(Default)]
pub struct Listeners {
    entries: Mutex<Vec<Listener>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Adding the same `Arc` twice is a no-op.
    ///
    /// Returns `true` if the listener was newly added.
    pub fn add(&self, listener: &Listener) -> bool {
        let mut entries = self.lock();
        if entries.iter().any(|l| same(l, listener)) {
            return false;
        }
        entries.push(Arc::clone(listener));
        true
    }

    /// Unregister a listener. Returns `true` if it was registered.
    pub fn remove(&self, listener: &Listener) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|l| !same(l, listener));
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Call every listener in registration order.
    ///
    /// The list is copied first, so listeners may add or remove listeners
    /// without deadlocking; such changes apply from the next notification.
    pub fn notify(&self, state: &CoordinatorState) {
        let entries: Vec<Listener> = self.lock().clone();
        for listener in entries {
            listener(state);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Listener>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn same(a: &Listener, b: &Listener) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinate, SearchRadius};

    fn state() -> CoordinatorState {
        CoordinatorState::idle(Coordinate::new(0.0, 0.0).unwrap(), SearchRadius::default())
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Listener {
        let log = Arc::clone(log);
        Arc::new(move |_: &CoordinatorState| log.lock().unwrap().push(name))
    }

    #[test]
    fn notifies_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let listeners = Listeners::new();
        listeners.add(&recorder(&log, "first"));
        listeners.add(&recorder(&log, "second"));
        listeners.add(&recorder(&log, "third"));

        listeners.notify(&state());
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn add_is_idempotent() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let listeners = Listeners::new();
        let l = recorder(&log, "only");

        assert!(listeners.add(&l));
        assert!(!listeners.add(&l));
        assert_eq!(listeners.len(), 1);

        listeners.notify(&state());
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn remove_by_identity() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let listeners = Listeners::new();
        let a = recorder(&log, "a");
        let b = recorder(&log, "b");
        listeners.add(&a);
        listeners.add(&b);

        assert!(listeners.remove(&a));
        assert!(!listeners.remove(&a));

        listeners.notify(&state());
        assert_eq!(*log.lock().unwrap(), vec!["b"]);
    }

    #[test]
    fn listener_can_unregister_itself() {
        let listeners = Arc::new(Listeners::new());
        let slot: Arc<Mutex<Option<Listener>>> = Arc::new(Mutex::new(None));

        let l: Listener = {
            let listeners = Arc::clone(&listeners);
            let slot = Arc::clone(&slot);
            Arc::new(move |_: &CoordinatorState| {
                if let Some(me) = slot.lock().unwrap().take() {
                    listeners.remove(&me);
                }
            })
        };
        *slot.lock().unwrap() = Some(Arc::clone(&l));
        listeners.add(&l);

        listeners.notify(&state());
        assert!(listeners.is_empty());
    }
}
