use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::error::{DmxError, Result};
use crate::output::{lock, Output};
use crate::plan::TransitionPlan;

/// Lifecycle of the fade run owned by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// No fade thread is stepping.
    Idle,
    /// A fade thread is stepping.
    Running,
    /// The fade thread has been asked to stop and has not yet exited.
    CancelRequested,
}

/// Phase plus the condvar the fade thread sleeps on between ticks.
struct RunSignal {
    phase: Mutex<RunPhase>,
    wake: Condvar,
}

impl RunSignal {
    fn new() -> Self {
        Self {
            phase: Mutex::new(RunPhase::Idle),
            wake: Condvar::new(),
        }
    }

    fn phase(&self) -> RunPhase {
        *lock(&self.phase)
    }

    fn set(&self, phase: RunPhase) {
        *lock(&self.phase) = phase;
        self.wake.notify_all();
    }

    /// Returns true if a running fade was asked to stop.
    fn request_cancel(&self) -> bool {
        let mut phase = lock(&self.phase);
        if *phase != RunPhase::Running {
            return false;
        }
        *phase = RunPhase::CancelRequested;
        self.wake.notify_all();
        true
    }

    /// Sleep for up to `timeout`, waking early on cancellation.
    ///
    /// Returns true if the run was cancelled.
    fn wait_cancelled(&self, timeout: Duration) -> bool {
        let guard = lock(&self.phase);
        let (guard, _) = self
            .wake
            .wait_timeout_while(guard, timeout, |phase| *phase == RunPhase::Running)
            .unwrap_or_else(PoisonError::into_inner);
        *guard == RunPhase::CancelRequested
    }
}

/// Counts live fade loops for as long as it is held.
pub(crate) struct ActiveRun(Arc<AtomicUsize>);

impl ActiveRun {
    pub(crate) fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Drives ramps on a dedicated thread, at most one at a time.
///
/// Starting a ramp while another is running cancels the old one and joins its
/// thread before the new plan is even built, so two fade loops never write
/// the universe concurrently.
pub struct TransitionEngine {
    signal: Arc<RunSignal>,
    handle: Mutex<Option<JoinHandle<()>>>,
    active: Arc<AtomicUsize>,
}

impl TransitionEngine {
    pub fn new() -> Self {
        Self {
            signal: Arc::new(RunSignal::new()),
            handle: Mutex::new(None),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.signal.phase()
    }

    pub fn is_running(&self) -> bool {
        self.phase() != RunPhase::Idle
    }

    /// Fade loops alive right now. Never exceeds 1.
    pub fn active_runs(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Supersede any active run, then build and launch a new one.
    ///
    /// `build` runs after the old thread has been joined, so it sees the
    /// levels the old run actually left behind.
    pub(crate) fn start<F>(&self, output: &Arc<Output>, build: F) -> Result<()>
    where
        F: FnOnce() -> Result<TransitionPlan>,
    {
        let mut slot = lock(&self.handle);
        if let Some(previous) = slot.take() {
            if self.signal.request_cancel() {
                debug!("superseding active ramp");
            }
            join_run(previous);
        }
        self.signal.set(RunPhase::Idle);

        let plan = build()?;
        debug!(
            channels = plan.steps().len(),
            steps = plan.step_count(),
            duration = ?plan.duration(),
            "starting ramp"
        );

        self.signal.set(RunPhase::Running);
        let signal = Arc::clone(&self.signal);
        let output = Arc::clone(output);
        let active = Arc::clone(&self.active);
        let spawned = thread::Builder::new()
            .name("simpledmx-fade".to_string())
            .spawn(move || {
                let _run = ActiveRun::enter(&active);
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_plan(&plan, &output, &signal);
                }));
                if outcome.is_err() {
                    output.record_error(DmxError::EngineFailed("fade loop panicked".to_string()));
                }
                signal.set(RunPhase::Idle);
            });

        match spawned {
            Ok(handle) => {
                *slot = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.signal.set(RunPhase::Idle);
                Err(DmxError::EngineFailed(format!(
                    "failed to spawn fade thread: {err}"
                )))
            }
        }
    }

    /// Stop the active run, if any, and wait for its thread to exit.
    ///
    /// Cancellation is requested before the handle slot is locked, so a
    /// concurrent [`wait`](Self::wait) does not hold it up.
    pub fn cancel(&self) {
        self.signal.request_cancel();
        let mut slot = lock(&self.handle);
        if let Some(handle) = slot.take() {
            if self.signal.request_cancel() {
                debug!("cancelling ramp");
            }
            join_run(handle);
        }
        self.signal.set(RunPhase::Idle);
    }

    /// Wait for the active run, if any, to finish on its own.
    pub fn wait(&self) {
        let mut slot = lock(&self.handle);
        if let Some(handle) = slot.take() {
            join_run(handle);
        }
        self.signal.set(RunPhase::Idle);
    }
}

impl Default for TransitionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TransitionEngine {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for TransitionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionEngine")
            .field("phase", &self.phase())
            .field("active_runs", &self.active_runs())
            .finish()
    }
}

fn join_run(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        warn!("fade thread panicked");
    }
}

fn run_plan(plan: &TransitionPlan, output: &Output, signal: &RunSignal) {
    let budget = plan.step_budget();

    for n in 1..=plan.step_count() {
        if signal.phase() == RunPhase::CancelRequested {
            debug!(step = n, "ramp cancelled before tick");
            return;
        }

        let tick = Instant::now();
        if let Err(err) = output.step(plan, n) {
            output.record_error(err);
            return;
        }
        trace!(step = n, "rendered fade tick");

        let remaining = budget.saturating_sub(tick.elapsed());
        if signal.wait_cancelled(remaining) {
            debug!(step = n, "ramp cancelled");
            return;
        }
    }

    debug!("ramp complete");
}
