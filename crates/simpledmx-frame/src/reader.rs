use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::{debug, trace};

use crate::codec::{decode_packet, Packet, MAX_PAYLOAD};
use crate::error::{FrameError, Result};
use crate::label::{is_known, label_name};

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 256;

/// Reads complete widget packets from any `Read` stream.
///
/// Handles partial reads internally — callers always get complete packets.
pub struct PacketReader<T> {
    inner: T,
    buf: BytesMut,
    max_payload: usize,
}

impl<T: Read> PacketReader<T> {
    /// Create a new packet reader accepting payloads up to [`MAX_PAYLOAD`].
    pub fn new(inner: T) -> Self {
        Self::with_max_payload(inner, MAX_PAYLOAD)
    }

    /// Create a new packet reader with an explicit payload limit.
    pub fn with_max_payload(inner: T, max_payload: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_payload,
        }
    }

    /// Read the next complete packet (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_packet(&mut self) -> Result<Packet> {
        loop {
            if let Some(packet) = decode_packet(&mut self.buf, self.max_payload)? {
                if is_known(packet.label) {
                    trace!(
                        label = label_name(packet.label),
                        len = packet.payload.len(),
                        "read packet"
                    );
                } else {
                    debug!(
                        label = packet.label,
                        len = packet.payload.len(),
                        "read packet with unrecognised label"
                    );
                }
                return Ok(packet);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
