// ── Update coordinator ──
//
// Owns the refresh schedule for one account, runs at most one fetch at
// a time, swaps in a fresh snapshot on success, and fans every
// completed cycle out to observers.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::{Mutex, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use pettracer_api::{DeviceSource, RawDevice};

use crate::config::CoordinatorConfig;
use crate::convert::normalize;
use crate::error::{CoreError, FailureKind, UpdateFailure};
use crate::model::Device;
use crate::store::{CycleUpdate, Observer, ObserverSet, Snapshot, SubscriptionHandle};
use crate::stream::UpdateStream;

type CycleResult = Result<Arc<Snapshot>, UpdateFailure>;
type InFlightCycle = Shared<BoxFuture<'static, CycleResult>>;

// ── CoordinatorState ─────────────────────────────────────────────

/// Why the coordinator stopped polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `stop()` was called (account unloaded).
    Shutdown,
    /// The API rejected the credentials; the account needs new ones.
    AuthFailed,
}

/// Lifecycle state observable by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Fetching,
    /// Terminal. A new coordinator has to be built to resume polling.
    Stopped(StopReason),
}

// ── Coordinator ──────────────────────────────────────────────────

/// Polling coordinator for one petTracer account.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Every clone shares the
/// same snapshot, observer set, and single-flight slot.
pub struct Coordinator<S: DeviceSource> {
    inner: Arc<CoordinatorInner<S>>,
}

impl<S: DeviceSource> Clone for Coordinator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: DeviceSource> fmt::Debug for Coordinator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("name", &self.inner.config.name)
            .field("state", &*self.inner.state.borrow())
            .field("cycles", &self.cycles())
            .finish_non_exhaustive()
    }
}

struct CoordinatorInner<S> {
    config: CoordinatorConfig,
    source: S,
    /// Sole writer is the running cycle; readers never block.
    snapshot: ArcSwap<Snapshot>,
    observers: ObserverSet,
    updates: watch::Sender<Arc<CycleUpdate>>,
    state: watch::Sender<CoordinatorState>,
    /// The cycle currently running, shared by every caller that asks
    /// for a refresh while it is in flight.
    in_flight: Mutex<Option<InFlightCycle>>,
    cycles: AtomicU64,
    consecutive_failures: AtomicU32,
    last_update_success: AtomicBool,
    last_success_at: ArcSwapOption<DateTime<Utc>>,
    cancel: CancellationToken,
    schedule: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl<S: DeviceSource> Coordinator<S> {
    /// Create a coordinator with an empty snapshot. Does NOT fetch or
    /// schedule anything: call [`refresh_now()`](Self::refresh_now) for
    /// the first refresh, then [`start()`](Self::start).
    pub fn new(source: S, config: CoordinatorConfig) -> Self {
        let (updates, _) = watch::channel(Arc::new(CycleUpdate::initial()));
        let (state, _) = watch::channel(CoordinatorState::Idle);

        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                source,
                snapshot: ArcSwap::from_pointee(Snapshot::empty()),
                observers: ObserverSet::new(),
                updates,
                state,
                in_flight: Mutex::new(None),
                cycles: AtomicU64::new(0),
                consecutive_failures: AtomicU32::new(0),
                last_update_success: AtomicBool::new(true),
                last_success_at: ArcSwapOption::empty(),
                cancel: CancellationToken::new(),
                schedule: Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn source(&self) -> &S {
        &self.inner.source
    }

    // ── Schedule lifecycle ───────────────────────────────────────

    /// Begin polling every `interval`.
    ///
    /// The first scheduled cycle runs one full interval from now; the
    /// initial refresh is expected to have happened already.
    pub async fn start(&self, interval: Duration) -> Result<(), CoreError> {
        if interval.is_zero() {
            return Err(CoreError::InvalidInterval);
        }
        if self.is_stopped() {
            return Err(CoreError::Stopped);
        }

        let mut schedule = self.inner.schedule.lock().await;
        if schedule.is_some() {
            return Err(CoreError::ScheduleAlreadyRunning);
        }

        let coordinator = self.clone();
        let cancel = self.inner.cancel.clone();
        *schedule = Some(tokio::spawn(refresh_task(coordinator, interval, cancel)));

        info!(
            name = %self.inner.config.name,
            interval_secs = interval.as_secs(),
            "refresh schedule started"
        );
        Ok(())
    }

    /// Cancel the schedule and release the device source.
    ///
    /// Idempotent. The current snapshot stays readable but is frozen: a
    /// fetch that completes after this point is discarded.
    pub async fn stop(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.inner.cancel.cancel();

        let schedule = self.inner.schedule.lock().await.take();
        if let Some(handle) = schedule {
            let _ = handle.await;
        }
        self.inner.in_flight.lock().await.take();

        self.inner.source.close().await;
        self.enter_stopped(StopReason::Shutdown);
        info!(name = %self.inner.config.name, "coordinator stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Run one fetch-and-normalize cycle now.
    ///
    /// Single-flight: if a cycle is already running, this joins it and
    /// returns its result instead of issuing a second fetch. The cycle
    /// runs on its own task, so dropping this future does not cancel it.
    pub async fn refresh_now(&self) -> CycleResult {
        if self.is_stopped() {
            return Err(UpdateFailure::stopped());
        }

        let cycle = {
            let mut slot = self.inner.in_flight.lock().await;
            if let Some(running) = slot.as_ref() {
                debug!("refresh already in flight, joining it");
                running.clone()
            } else {
                // Detached: the cycle finishes even if every caller stops waiting.
                let task = tokio::spawn({
                    let coordinator = self.clone();
                    async move { coordinator.run_cycle().await }
                });
                let coordinator = self.clone();
                let cycle = async move {
                    match task.await {
                        Ok(result) => result,
                        Err(err) => Err(coordinator.abandon_cycle(&err).await),
                    }
                }
                .boxed()
                .shared();
                *slot = Some(cycle.clone());
                cycle
            }
        };

        cycle.await
    }

    async fn run_cycle(&self) -> CycleResult {
        self.set_state(CoordinatorState::Fetching);

        let fetched = self.inner.source.fetch_all_devices().await;

        let result = if self.is_stopped() {
            debug!("coordinator stopped during fetch, discarding result");
            Err(UpdateFailure::stopped())
        } else {
            match fetched {
                Ok(raw) => Ok(self.apply_success(raw)),
                Err(err) => Err(self.apply_failure(UpdateFailure::from(err))),
            }
        };

        self.inner.in_flight.lock().await.take();
        result
    }

    /// The cycle task panicked or was aborted before clearing its slot.
    async fn abandon_cycle(&self, err: &JoinError) -> UpdateFailure {
        self.inner.in_flight.lock().await.take();
        if self.is_stopped() {
            return UpdateFailure::stopped();
        }
        self.apply_failure(UpdateFailure {
            kind: FailureKind::Transient,
            message: format!("refresh task failed: {err}"),
        })
    }

    fn apply_success(&self, raw: Vec<RawDevice>) -> Arc<Snapshot> {
        let snapshot = Arc::new(normalize(raw));
        self.inner.snapshot.store(Arc::clone(&snapshot));

        self.inner.consecutive_failures.store(0, Ordering::Release);
        self.inner.last_update_success.store(true, Ordering::Release);
        self.inner.last_success_at.store(Some(Arc::new(Utc::now())));

        debug!(
            name = %self.inner.config.name,
            device_count = snapshot.len(),
            "refresh succeeded"
        );

        self.set_state(CoordinatorState::Idle);
        self.publish(Arc::clone(&snapshot), None);
        snapshot
    }

    fn apply_failure(&self, failure: UpdateFailure) -> UpdateFailure {
        let failures = self
            .inner
            .consecutive_failures
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1);
        self.inner.last_update_success.store(false, Ordering::Release);

        if failure.is_auth() {
            error!(
                name = %self.inner.config.name,
                error = %failure,
                "credentials rejected, stopping refresh schedule"
            );
            self.inner.cancel.cancel();
            self.enter_stopped(StopReason::AuthFailed);
        } else {
            warn!(
                name = %self.inner.config.name,
                consecutive_failures = failures,
                error = %failure,
                "refresh failed, keeping previous snapshot"
            );
            self.set_state(CoordinatorState::Idle);
        }

        self.publish(self.inner.snapshot.load_full(), Some(failure.clone()));
        failure
    }

    fn publish(&self, snapshot: Arc<Snapshot>, failure: Option<UpdateFailure>) {
        let cycle = self.inner.cycles.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        let update = Arc::new(CycleUpdate {
            cycle,
            snapshot,
            failure,
        });
        self.inner.updates.send_replace(Arc::clone(&update));
        self.inner.observers.notify(&update);
    }

    /// Move between `Idle` and `Fetching`. Never leaves `Stopped`.
    fn set_state(&self, next: CoordinatorState) {
        self.inner.state.send_if_modified(|state| {
            if matches!(state, CoordinatorState::Stopped(_)) || *state == next {
                return false;
            }
            *state = next;
            true
        });
    }

    /// First stop reason wins.
    fn enter_stopped(&self, reason: StopReason) {
        self.inner.state.send_if_modified(|state| {
            if matches!(state, CoordinatorState::Stopped(_)) {
                return false;
            }
            *state = CoordinatorState::Stopped(reason);
            true
        });
    }

    // ── Reads ────────────────────────────────────────────────────

    /// The last successfully fetched snapshot; empty before the first
    /// success. Never blocks.
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.inner.snapshot.load_full()
    }

    /// Look up one device in the current snapshot.
    pub fn device(&self, id: &str) -> Option<Arc<Device>> {
        self.inner.snapshot.load().get(id).cloned()
    }

    /// Whether the most recent cycle succeeded (`true` before the first cycle).
    pub fn last_update_success(&self) -> bool {
        self.inner.last_update_success.load(Ordering::Acquire)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.consecutive_failures.load(Ordering::Acquire)
    }

    pub fn last_success_at(&self) -> Option<DateTime<Utc>> {
        self.inner.last_success_at.load().as_deref().copied()
    }

    /// Number of completed cycles (successful or not).
    pub fn cycles(&self) -> u64 {
        self.inner.cycles.load(Ordering::Acquire)
    }

    // ── Observation ──────────────────────────────────────────────

    /// Register a callback invoked after every completed cycle.
    pub fn subscribe(&self, observer: impl Observer + 'static) -> SubscriptionHandle {
        self.inner.observers.subscribe(Arc::new(observer))
    }

    /// Remove a callback. Safe to call from inside a callback.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.inner.observers.unsubscribe(handle)
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.len()
    }

    /// Async handle on completed cycles.
    pub fn updates(&self) -> UpdateStream {
        UpdateStream::new(self.inner.updates.subscribe())
    }

    /// Subscribe to lifecycle state changes.
    pub fn state(&self) -> watch::Receiver<CoordinatorState> {
        self.inner.state.subscribe()
    }
}

// ── Background task ──────────────────────────────────────────────

/// Refresh on a fixed period until cancelled.
///
/// There is no backoff: after a transient failure the next tick is the
/// retry. A fetch that outlasts the period delays the next tick rather
/// than overlapping with it.
async fn refresh_task<S: DeviceSource>(
    coordinator: Coordinator<S>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    result = coordinator.refresh_now() => {
                        if let Err(e) = result {
                            debug!(error = %e, "scheduled refresh failed");
                        }
                    }
                }
            }
        }
    }

    debug!(name = %coordinator.inner.config.name, "refresh task exited");
}
