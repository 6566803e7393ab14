//! In-memory ports for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use simpledmx_transport::{DmxPort, Result, TransportError};

/// Keeps every packet written to it.
#[derive(Clone, Default)]
pub(crate) struct RecordingPort {
    packets: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RecordingPort {
    pub(crate) fn packet_count(&self) -> usize {
        self.packets.lock().unwrap().len()
    }

    pub(crate) fn last_packet(&self) -> Option<Vec<u8>> {
        self.packets.lock().unwrap().last().cloned()
    }
}

impl DmxPort for RecordingPort {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.packets.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Times out on every write and counts the attempts.
#[derive(Clone, Default)]
pub(crate) struct TimeoutPort {
    attempts: Arc<AtomicUsize>,
}

impl TimeoutPort {
    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl DmxPort for TimeoutPort {
    fn write_all(&mut self, _bytes: &[u8]) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::WriteTimeout(Duration::from_millis(10)))
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "timeout"
    }
}
