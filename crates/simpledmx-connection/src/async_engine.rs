//! Tokio flavor of the fade engine (`async` feature).
//!
//! Same stepping algorithm and single-run guarantee as
//! [`TransitionEngine`](crate::TransitionEngine), but each ramp is a tokio task
//! and cancellation is a [`CancellationToken`] raced against the tick sleep.
//! Each tick's port write runs on the blocking pool, so a slow widget never
//! stalls the runtime thread.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use simpledmx_frame::Universe;
#[cfg(unix)]
use simpledmx_transport::SerialPort;
use simpledmx_transport::DmxPort;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::config::ConnectionConfig;
use crate::engine::ActiveRun;
use crate::error::{DmxError, Result};
use crate::fault::FaultHandler;
use crate::output::{lock, Output};
use crate::plan::TransitionPlan;

struct ActiveTask {
    handle: JoinHandle<()>,
    output: Arc<Output>,
}

/// Clears the running flag when the fade task's future is dropped.
struct RunningFlag(Arc<AtomicBool>);

impl RunningFlag {
    fn raise(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(Arc::clone(flag))
    }
}

impl Drop for RunningFlag {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives ramps as tokio tasks, at most one at a time.
///
/// A task stays in the engine's slot until it has been joined. If a caller's
/// `start`, `cancel` or `wait` future is dropped mid-join, the next caller
/// finds the same task and joins it before anything new is spawned.
///
/// Dropping the engine cancels the active task but cannot wait for it; a tick
/// already in flight may still render once. Await
/// [`cancel`](Self::cancel) first for a clean stop.
pub struct AsyncTransitionEngine {
    current: Mutex<Option<ActiveTask>>,
    token: StdMutex<CancellationToken>,
    running: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
}

impl AsyncTransitionEngine {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            token: StdMutex::new(CancellationToken::new()),
            running: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fade tasks alive right now. Never exceeds 1.
    pub fn active_runs(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// True while a fade task has not finished. Never waits.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) async fn start<F>(&self, output: &Arc<Output>, build: F) -> Result<()>
    where
        F: FnOnce() -> Result<TransitionPlan>,
    {
        let mut slot = self.current.lock().await;
        if let Some(task) = slot.as_mut() {
            if !task.handle.is_finished() {
                debug!("superseding active ramp");
            }
            lock(&self.token).cancel();
            join_task(task).await;
        }
        *slot = None;

        let plan = build()?;
        debug!(
            channels = plan.steps().len(),
            steps = plan.step_count(),
            duration = ?plan.duration(),
            "starting ramp"
        );

        let token = CancellationToken::new();
        *lock(&self.token) = token.clone();
        let handle = tokio::spawn(run_plan(
            Arc::new(plan),
            Arc::clone(output),
            token,
            Arc::clone(&self.active),
            RunningFlag::raise(&self.running),
        ));
        *slot = Some(ActiveTask {
            handle,
            output: Arc::clone(output),
        });
        Ok(())
    }

    /// Stop the active run, if any, and wait for its task to exit.
    ///
    /// Cancellation is signalled before the slot is locked, so a concurrent
    /// [`wait`](Self::wait) does not hold it up.
    pub async fn cancel(&self) {
        lock(&self.token).cancel();
        let mut slot = self.current.lock().await;
        if let Some(task) = slot.as_mut() {
            // A ramp may have started while this call waited for the slot.
            lock(&self.token).cancel();
            join_task(task).await;
        }
        *slot = None;
    }

    /// Wait for the active run, if any, to finish on its own.
    pub async fn wait(&self) {
        let mut slot = self.current.lock().await;
        if let Some(task) = slot.as_mut() {
            join_task(task).await;
        }
        *slot = None;
    }
}

impl Default for AsyncTransitionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AsyncTransitionEngine {
    fn drop(&mut self) {
        lock(&self.token).cancel();
    }
}

impl std::fmt::Debug for AsyncTransitionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncTransitionEngine")
            .field("running", &self.is_running())
            .field("active_runs", &self.active_runs())
            .finish()
    }
}

/// Join the task through a borrow so a dropped caller leaves it in the slot.
async fn join_task(task: &mut ActiveTask) {
    if let Err(err) = (&mut task.handle).await {
        if err.is_panic() {
            task.output.record_error(DmxError::EngineFailed(err.to_string()));
        }
    }
}

async fn run_plan(
    plan: Arc<TransitionPlan>,
    output: Arc<Output>,
    token: CancellationToken,
    active: Arc<AtomicUsize>,
    _running: RunningFlag,
) {
    let _run = ActiveRun::enter(&active);
    let budget = plan.step_budget();

    for n in 1..=plan.step_count() {
        if token.is_cancelled() {
            debug!(step = n, "ramp cancelled before tick");
            return;
        }

        let tick = Instant::now();
        let stepped = {
            let plan = Arc::clone(&plan);
            let output = Arc::clone(&output);
            tokio::task::spawn_blocking(move || output.step(&plan, n)).await
        };
        match stepped {
            Ok(Ok(())) => trace!(step = n, "rendered fade tick"),
            Ok(Err(err)) => {
                output.record_error(err);
                return;
            }
            Err(err) => {
                output.record_error(DmxError::EngineFailed(err.to_string()));
                return;
            }
        }

        let remaining = budget.saturating_sub(tick.elapsed());
        tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!(step = n, "ramp cancelled");
                return;
            }
            () = tokio::time::sleep(remaining) => {}
        }
    }

    debug!("ramp complete");
}

/// [`DmxConnection`](crate::DmxConnection) for tokio applications.
///
/// Channel access and `render` are synchronous; ramp control is async.
///
/// Unlike the thread-based connection, dropping this one cannot join the
/// fade task: it is cancelled, and at most one in-flight tick may still
/// reach the port. Call [`close`](Self::close) to cancel, join and close.
pub struct AsyncDmxConnection {
    output: Arc<Output>,
    engine: AsyncTransitionEngine,
    config: ConnectionConfig,
}

impl AsyncDmxConnection {
    /// Open a serial widget (e.g. `/dev/ttyUSB0`).
    #[cfg(unix)]
    pub fn open(path: impl AsRef<std::path::Path>, config: ConnectionConfig) -> Result<Self> {
        let port = SerialPort::open(path, &config.port)?;
        Self::with_port(port, config)
    }

    /// Build a connection over an already opened port.
    pub fn with_port(port: impl DmxPort + 'static, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let universe = Universe::new(config.num_channels)?;
        info!(
            port = port.name(),
            channels = config.num_channels,
            "dmx connection ready"
        );
        Ok(Self {
            output: Arc::new(Output::new(universe, Box::new(port))),
            engine: AsyncTransitionEngine::new(),
            config,
        })
    }

    pub fn with_fault_handler(self, handler: impl FaultHandler + 'static) -> Self {
        self.output.set_fault_handler(Arc::new(handler));
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn set_channel(&self, chan: u16, val: i32) -> Result<()> {
        self.output.set_channel(chan, val)?;
        self.autorender()
    }

    pub fn read_channel(&self, chan: u16) -> Result<u8> {
        self.output.read_channel(chan)
    }

    pub fn clear(&self, chan: Option<u16>) -> Result<()> {
        self.output.clear(chan)?;
        self.autorender()
    }

    pub fn frame(&self) -> Vec<u8> {
        self.output.snapshot()
    }

    pub fn render(&self) -> Result<()> {
        self.output.render()
    }

    /// Fade `channels` to `targets` over `duration`.
    ///
    /// Returns once the new fade task is spawned; it does not wait for it.
    pub async fn ramp(&self, channels: &[u16], targets: &[i32], duration: Duration) -> Result<()> {
        self.output.validate_ramp(channels, targets)?;
        let step_count = self.config.step_count;
        self.engine
            .start(&self.output, || {
                self.output.plan(channels, targets, step_count, duration)
            })
            .await
    }

    pub async fn cancel_ramp(&self) {
        self.engine.cancel().await;
    }

    pub async fn wait_for_ramp(&self) {
        self.engine.wait().await;
    }

    pub fn is_ramping(&self) -> bool {
        self.engine.is_running()
    }

    pub fn engine(&self) -> &AsyncTransitionEngine {
        &self.engine
    }

    pub fn take_last_error(&self) -> Option<DmxError> {
        self.output.take_last_error()
    }

    pub async fn close(&self) -> Result<()> {
        self.engine.cancel().await;
        self.output.close()
    }

    fn autorender(&self) -> Result<()> {
        if self.config.autorender {
            self.output.render()?;
        }
        Ok(())
    }
}
