//! Render a short fade into memory and decode the packets back.
//!
//! Run with:
//!   cargo run --example loopback

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use simpledmx::connection::{ConnectionConfig, DmxConnection};
use simpledmx::frame::{label_name, PacketReader};
use simpledmx::transport::StreamPort;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("buffer poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let wire = SharedBuffer::default();
    let config = ConnectionConfig {
        num_channels: 4,
        step_count: 8,
        ..ConnectionConfig::default()
    };
    let conn = DmxConnection::with_port(StreamPort::new(wire.clone()).named("memory"), config)?;

    conn.ramp(&[1, 4], &[255, 100], Duration::from_millis(80))?;
    conn.wait_for_ramp();

    let bytes = wire
        .0
        .lock()
        .map_err(|_| "buffer poisoned")?
        .clone();
    let mut reader = PacketReader::new(Cursor::new(bytes));
    while let Ok(packet) = reader.read_packet() {
        eprintln!("{:<14} {:?}", label_name(packet.label), packet.payload.as_ref());
    }
    Ok(())
}
