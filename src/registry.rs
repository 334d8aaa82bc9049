//! Request correlation registry.
//!
//! A caller registers an id, sends its query, then blocks in `wait` until
//! the transport reader resolves the id or the timeout passes. Every exit
//! path of `wait` removes the id's bookkeeping, so the registry never grows
//! with abandoned requests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use scopeguard::defer;
use tracing::trace;

use crate::value::Value;

#[derive(Debug)]
enum WaitState {
    Pending,
    Resolved(Value),
    Cancelled,
}

#[derive(Debug)]
struct Waiter {
    state: Mutex<WaitState>,
    signal: Condvar,
}

impl Waiter {
    fn new() -> Self {
        Self {
            state: Mutex::new(WaitState::Pending),
            signal: Condvar::new(),
        }
    }

    fn settle(&self, state: WaitState) {
        let mut slot = self.state.lock();
        if matches!(*slot, WaitState::Pending) {
            *slot = state;
            self.signal.notify_all();
        }
    }
}

/// Map of in-flight request ids to their wait primitives.
///
/// `resolve` is called from the transport reader thread while `wait` runs
/// on arbitrary caller threads; one mutex guards the map, each entry has
/// its own state lock so resolution never blocks behind a slow waiter.
pub struct PendingRequests {
    entries: Mutex<HashMap<String, Arc<Waiter>>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a waitable slot. Must happen before the request is sent,
    /// or a fast response could arrive with nothing to resolve.
    pub fn create(&self, id: &str) {
        self.entries
            .lock()
            .insert(id.to_string(), Arc::new(Waiter::new()));
    }

    /// Stores the value and wakes the waiter. Unknown ids (late or
    /// duplicate responses) are ignored.
    pub fn resolve(&self, id: &str, value: Value) {
        let waiter = self.entries.lock().get(id).cloned();
        match waiter {
            Some(waiter) => waiter.settle(WaitState::Resolved(value)),
            None => trace!(request_id = id, "response for unknown request id dropped"),
        }
    }

    /// Blocks up to `timeout` for the id to resolve.
    ///
    /// Returns `None` on timeout, cancellation, or an id that was never
    /// registered. The entry is removed before returning in every case.
    pub fn wait(&self, id: &str, timeout: Duration) -> Option<Value> {
        let waiter = self.entries.lock().get(id).cloned()?;
        defer! {
            self.entries.lock().remove(id);
        }

        let deadline = Instant::now() + timeout;
        let mut state = waiter.state.lock();
        loop {
            match std::mem::replace(&mut *state, WaitState::Pending) {
                WaitState::Resolved(value) => return Some(value),
                WaitState::Cancelled => return None,
                WaitState::Pending => {}
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            waiter.signal.wait_for(&mut state, deadline - now);
        }
    }

    /// Wakes every outstanding waiter empty-handed and drops every entry,
    /// including ids that were created but never waited on. Used at
    /// shutdown so no caller hangs on a channel that will never respond
    /// again.
    pub fn clear(&self) {
        let waiters: Vec<Arc<Waiter>> = self
            .entries
            .lock()
            .drain()
            .map(|(_, waiter)| waiter)
            .collect();
        for waiter in waiters {
            waiter.settle(WaitState::Cancelled);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new()
    }
}
