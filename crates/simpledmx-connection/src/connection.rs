use std::sync::Arc;
use std::time::Duration;

use simpledmx_frame::Universe;
#[cfg(unix)]
use simpledmx_transport::SerialPort;
use simpledmx_transport::DmxPort;
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::engine::TransitionEngine;
use crate::error::{DmxError, Result};
use crate::fault::FaultHandler;
use crate::output::Output;

/// A live link to one USB DMX widget and the universe it outputs.
///
/// Channel levels are changed in memory with [`set_channel`](Self::set_channel)
/// and [`clear`](Self::clear), and sent with [`render`](Self::render).
/// [`ramp`](Self::ramp) fades channels on a background thread, rendering once
/// per tick.
///
/// The universe is guarded by a mutex. A `set_channel` while a ramp is
/// running is applied atomically, but the ramp's next tick overwrites any
/// channel the ramp owns.
pub struct DmxConnection {
    output: Arc<Output>,
    engine: TransitionEngine,
    config: ConnectionConfig,
}

impl DmxConnection {
    /// Open a serial widget (e.g. `/dev/ttyUSB0`).
    ///
    /// Failure to open is returned to the caller; nothing exits the process.
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
            engine: TransitionEngine::new(),
            config,
        })
    }

    /// Replace the fault handler (default: propagate every failure).
    pub fn with_fault_handler(self, handler: impl FaultHandler + 'static) -> Self {
        self.set_fault_handler(handler);
        self
    }

    /// Replace the fault handler on a live connection.
    pub fn set_fault_handler(&self, handler: impl FaultHandler + 'static) {
        self.output.set_fault_handler(Arc::new(handler));
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn num_channels(&self) -> u16 {
        self.output.num_channels()
    }

    /// Set a channel level (clamped to `0..=255`).
    ///
    /// Renders afterwards only when `autorender` is configured.
    pub fn set_channel(&self, chan: u16, val: i32) -> Result<()> {
        self.output.set_channel(chan, val)?;
        self.autorender()
    }

    pub fn read_channel(&self, chan: u16) -> Result<u8> {
        self.output.read_channel(chan)
    }

    /// Zero one channel, or all of them for `None` / `Some(0)`.
    pub fn clear(&self, chan: Option<u16>) -> Result<()> {
        self.output.clear(chan)?;
        self.autorender()
    }

    /// Copy of every channel level, channel 1 first.
    pub fn frame(&self) -> Vec<u8> {
        self.output.snapshot()
    }

    /// Send the current universe to the widget.
    pub fn render(&self) -> Result<()> {
        self.output.render()
    }

    /// Fade `channels` to `targets` over `duration` without blocking.
    ///
    /// Arguments are validated before anything else happens, so a bad
    /// request leaves a running ramp untouched. Otherwise a running ramp is
    /// cancelled and joined, and the new one starts from wherever the old one
    /// left the levels. Failures inside the fade thread are reported through
    /// [`take_last_error`](Self::take_last_error).
    pub fn ramp(&self, channels: &[u16], targets: &[i32], duration: Duration) -> Result<()> {
        self.output.validate_ramp(channels, targets)?;
        let step_count = self.config.step_count;
        self.engine.start(&self.output, || {
            self.output.plan(channels, targets, step_count, duration)
        })
    }

    /// Stop the running ramp, if any, leaving levels where they are.
    pub fn cancel_ramp(&self) {
        self.engine.cancel();
    }

    /// Block until the running ramp, if any, completes.
    pub fn wait_for_ramp(&self) {
        self.engine.wait();
    }

    pub fn is_ramping(&self) -> bool {
        self.engine.is_running()
    }

    pub fn engine(&self) -> &TransitionEngine {
        &self.engine
    }

    /// The most recent failure of a background ramp, cleared on read.
    pub fn take_last_error(&self) -> Option<DmxError> {
        self.output.take_last_error()
    }

    /// Stop any ramp and close the port.
    pub fn close(&self) -> Result<()> {
        self.engine.cancel();
        debug!("closing dmx connection");
        self.output.close()
    }

    fn autorender(&self) -> Result<()> {
        if self.config.autorender {
            self.output.render()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for DmxConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DmxConnection")
            .field("channels", &self.num_channels())
            .field("engine", &self.engine)
            .finish()
    }
}
