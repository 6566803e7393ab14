use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use simpledmx_frame::{FrameError, PacketWriter, Universe};
use simpledmx_transport::DmxPort;
use tracing::{debug, info, warn};

use crate::error::{DmxError, Result};
use crate::fault::{Decision, FaultHandler, PropagateFaults};
use crate::plan::{TransitionPlan, TransitionStep};

/// State shared between the caller and the fade task.
///
/// Lock order is writer, then universe. The universe lock is never held
/// across a port write: `render` copies the levels out under the writer lock,
/// so packets reach the wire in the order their snapshots were taken.
pub(crate) struct Output {
    universe: Mutex<Universe>,
    writer: Mutex<PacketWriter<Box<dyn DmxPort>>>,
    fault_handler: Mutex<Arc<dyn FaultHandler>>,
    last_error: Mutex<Option<DmxError>>,
}

impl Output {
    pub(crate) fn new(universe: Universe, port: Box<dyn DmxPort>) -> Self {
        Self {
            universe: Mutex::new(universe),
            writer: Mutex::new(PacketWriter::new(port)),
            fault_handler: Mutex::new(Arc::new(PropagateFaults)),
            last_error: Mutex::new(None),
        }
    }

    pub(crate) fn set_fault_handler(&self, handler: Arc<dyn FaultHandler>) {
        *lock(&self.fault_handler) = handler;
    }

    pub(crate) fn num_channels(&self) -> u16 {
        lock(&self.universe).len()
    }

    pub(crate) fn set_channel(&self, chan: u16, val: i32) -> Result<()> {
        lock(&self.universe).set_channel(chan, val)?;
        Ok(())
    }

    pub(crate) fn read_channel(&self, chan: u16) -> Result<u8> {
        Ok(lock(&self.universe).read_channel(chan)?)
    }

    pub(crate) fn clear(&self, chan: Option<u16>) -> Result<()> {
        lock(&self.universe).clear(chan)?;
        Ok(())
    }

    pub(crate) fn snapshot(&self) -> Vec<u8> {
        lock(&self.universe).as_bytes().to_vec()
    }

    /// Fail fast on a malformed ramp before anything is cancelled.
    pub(crate) fn validate_ramp(&self, channels: &[u16], targets: &[i32]) -> Result<()> {
        if channels.is_empty() {
            return Err(DmxError::InvalidRamp("no channels given".to_string()));
        }
        if channels.len() != targets.len() {
            return Err(DmxError::InvalidRamp(format!(
                "{} channels but {} target values",
                channels.len(),
                targets.len()
            )));
        }
        let universe = lock(&self.universe);
        for &chan in channels {
            universe.read_channel(chan)?;
        }
        Ok(())
    }

    /// Build a plan starting from the channels' current levels.
    pub(crate) fn plan(
        &self,
        channels: &[u16],
        targets: &[i32],
        step_count: u16,
        duration: Duration,
    ) -> Result<TransitionPlan> {
        let universe = lock(&self.universe);
        let steps = channels
            .iter()
            .zip(targets)
            .map(|(&chan, &target)| {
                let start = universe.read_channel(chan)?;
                let end = target.clamp(0, 255) as u8;
                Ok(TransitionStep::new(chan, start, end, step_count))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TransitionPlan::new(steps, step_count, duration))
    }

    /// Write tick `n` of `plan` into the universe, then render once.
    pub(crate) fn step(&self, plan: &TransitionPlan, n: u16) -> Result<()> {
        {
            let mut universe = lock(&self.universe);
            for (chan, level) in plan.levels_at(n) {
                universe.set_channel(chan, level)?;
            }
        }
        self.render()
    }

    /// Encode the universe and write it to the port.
    ///
    /// A port failure goes to the fault handler; only `Propagate` fails the call.
    pub(crate) fn render(&self) -> Result<()> {
        let result = {
            let mut writer = lock(&self.writer);
            let frame = lock(&self.universe).clone();
            writer.write_universe(&frame)
        };

        match result {
            Ok(()) => Ok(()),
            Err(FrameError::Transport(err)) => {
                let handler = lock(&self.fault_handler).clone();
                match handler.handle(&err) {
                    Decision::Propagate => Err(DmxError::Transport(err)),
                    Decision::Suppress => {
                        debug!(error = %err, "render failure suppressed");
                        Ok(())
                    }
                    Decision::RecoverAndRetry => {
                        info!(error = %err, "render failure handed to recovery");
                        Ok(())
                    }
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Store a failure from the fade task where the caller can find it.
    pub(crate) fn record_error(&self, err: DmxError) {
        warn!(error = %err, "background fade failed");
        *lock(&self.last_error) = Some(err);
    }

    pub(crate) fn take_last_error(&self) -> Option<DmxError> {
        lock(&self.last_error).take()
    }

    pub(crate) fn close(&self) -> Result<()> {
        lock(&self.writer).close()?;
        Ok(())
    }
}

/// Lock, recovering the data if a previous holder panicked.
///
/// Every critical section leaves the guarded value consistent, so a poisoned
/// lock still holds a usable universe.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
