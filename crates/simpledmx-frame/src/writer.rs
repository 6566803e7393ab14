use bytes::BytesMut;
use simpledmx_transport::DmxPort;
use tracing::trace;

use crate::codec::{encode_packet, encode_universe, Packet, MAX_PAYLOAD};
use crate::error::{FrameError, Result};
use crate::label::label_name;
use crate::universe::{Universe, MAX_CHANNELS};

const INITIAL_BUFFER_CAPACITY: usize = MAX_CHANNELS as usize + 5;

/// Writes complete widget packets to a [`DmxPort`].
///
/// The encode buffer is reused between packets, so steady-state rendering
/// does not allocate.
pub struct PacketWriter<P> {
    port: P,
    buf: BytesMut,
}

impl<P: DmxPort> PacketWriter<P> {
    /// Create a new packet writer over a port.
    pub fn new(port: P) -> Self {
        Self {
            port,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Encode and send the universe as a `TX_DMX_PACKET`.
    pub fn write_universe(&mut self, universe: &Universe) -> Result<()> {
        self.buf.clear();
        encode_universe(universe, &mut self.buf);
        self.flush_buf()
    }

    /// Write a complete packet.
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        self.send(packet.label, packet.payload.as_ref())
    }

    /// Encode and send a payload with an arbitrary label.
    pub fn send(&mut self, label: u8, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }

        self.buf.clear();
        encode_packet(label, payload, &mut self.buf)?;
        trace!(label = label_name(label), size = payload.len(), "sending packet");
        self.flush_buf()
    }

    fn flush_buf(&mut self) -> Result<()> {
        self.port.write_all(&self.buf)?;
        self.port.flush()?;
        Ok(())
    }

    /// Close the underlying port.
    pub fn close(&mut self) -> Result<()> {
        self.port.close().map_err(FrameError::from)
    }

    /// Borrow the underlying port.
    pub fn get_ref(&self) -> &P {
        &self.port
    }

    /// Mutably borrow the underlying port.
    pub fn get_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Consume the writer and return the inner port.
    pub fn into_inner(self) -> P {
        self.port
    }
}
