// Per-user in-flight pick guard.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::error::DraftError;
use crate::league::UserId;

/// Process-local mutual exclusion for pick submissions, keyed by user.
///
/// This suppresses duplicate near-simultaneous requests from one user (a
/// double-clicked pick button, or an auto-pick sweep racing that user's
/// manual pick). It is not a distributed lock: the authoritative draft
/// state lives in the store, which does its own version checking. Acquiring
/// for a user already in flight fails fast rather than queuing.
///
/// Constructed explicitly and shared via `Arc` so tests can run isolated
/// guard instances, and so a multi-process deployment can swap in a keyed
/// advisory lock without touching the engine's call contract.
#[derive(Debug, Default)]
pub struct PickGuard {
    in_flight: Mutex<HashSet<UserId>>,
}

impl PickGuard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Try to reserve the pick slot for `user`. Returns a permit that
    /// releases the slot on drop, including on early returns and panics, so
    /// a failed pick never permanently wedges a user out.
    pub fn acquire(self: &Arc<Self>, user: &UserId) -> Result<PickPermit, DraftError> {
        let mut in_flight = self.in_flight.lock().expect("pick guard poisoned");
        if !in_flight.insert(user.clone()) {
            return Err(DraftError::PickInProgress(user.clone()));
        }
        Ok(PickPermit {
            guard: Arc::clone(self),
            user: user.clone(),
        })
    }

    fn release(&self, user: &UserId) {
        let mut in_flight = self.in_flight.lock().expect("pick guard poisoned");
        in_flight.remove(user);
    }
}

/// RAII handle for a reserved pick slot.
#[derive(Debug)]
pub struct PickPermit {
    guard: Arc<PickGuard>,
    user: UserId,
}

impl Drop for PickPermit {
    fn drop(&mut self) {
        self.guard.release(&self.user);
    }
}
