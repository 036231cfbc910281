// ── Observer registry ──
//
// Observers are plain callbacks invoked once per completed cycle. The
// set is copied out before invoking anything, so a callback may
// subscribe or unsubscribe (itself or others) without deadlocking.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::Snapshot;
use crate::error::UpdateFailure;

/// What observers receive after every completed refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleUpdate {
    /// 1-based cycle counter; `0` is the initial, pre-refresh state.
    pub cycle: u64,
    /// Current snapshot. On failure this is the previous, retained one.
    pub snapshot: Arc<Snapshot>,
    pub failure: Option<UpdateFailure>,
}

impl CycleUpdate {
    pub(crate) fn initial() -> Self {
        Self {
            cycle: 0,
            snapshot: Arc::new(Snapshot::empty()),
            failure: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Capability to react to a completed refresh cycle.
///
/// Called synchronously from the task that ran the cycle; keep it cheap.
pub trait Observer: Send + Sync {
    fn on_update(&self, update: &CycleUpdate);
}

impl<F> Observer for F
where
    F: Fn(&CycleUpdate) + Send + Sync,
{
    fn on_update(&self, update: &CycleUpdate) {
        self(update);
    }
}

/// Token returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

pub(crate) struct ObserverSet {
    next_id: AtomicU64,
    observers: DashMap<u64, Arc<dyn Observer>>,
}

impl ObserverSet {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            observers: DashMap::new(),
        }
    }

    pub(crate) fn subscribe(&self, observer: Arc<dyn Observer>) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers.insert(id, observer);
        SubscriptionHandle(id)
    }

    /// Returns `true` if the handle was still registered.
    pub(crate) fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.observers.remove(&handle.0).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    /// Invoke every observer in subscription order.
    ///
    /// Observers removed by an earlier callback in the same round are
    /// skipped; observers added during the round first hear the next one.
    pub(crate) fn notify(&self, update: &CycleUpdate) {
        let mut targets: Vec<(u64, Arc<dyn Observer>)> = self
            .observers
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        targets.sort_unstable_by_key(|(id, _)| *id);

        for (id, observer) in targets {
            if self.observers.contains_key(&id) {
                observer.on_update(update);
            }
        }
    }
}
