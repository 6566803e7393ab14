use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::label::TX_DMX_PACKET;
use crate::universe::Universe;

/// First byte of every widget packet.
pub const START_MARKER: u8 = 0x7E;

/// Last byte of every widget packet.
pub const END_MARKER: u8 = 0xE7;

/// Packet header: start marker (1) + label (1) + length (2) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Packet trailer: end marker (1).
pub const TRAILER_SIZE: usize = 1;

/// Largest payload the widget firmware accepts in one message.
pub const MAX_PAYLOAD: usize = 600;

/// A decoded widget packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// The message label.
    pub label: u8,
    /// The message payload.
    pub payload: Bytes,
}

impl Packet {
    /// Create a new packet.
    pub fn new(label: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            label,
            payload: payload.into(),
        }
    }

    /// The total wire size of this packet (envelope + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + TRAILER_SIZE
    }
}

/// Encode a packet into the widget wire format.
///
/// Wire format:
/// ```text
/// ┌────────┬─────────┬──────────┬──────────────────┬────────┐
/// │ Start  │ Label   │ Length   │ Payload          │ End    │
/// │ 0x7E   │ (1B)    │ (2B LE)  │ (Length bytes)   │ 0xE7   │
/// └────────┴─────────┴──────────┴──────────────────┴────────┘
/// ```
pub fn encode_packet(label: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let Ok(len) = u16::try_from(payload.len()) else {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u16::MAX as usize,
        });
    };
    put_envelope(label, len, payload, dst);
    Ok(())
}

/// Encode a universe as a `TX_DMX_PACKET`.
///
/// Always produces `universe.len() + 5` bytes.
pub fn encode_universe(universe: &Universe, dst: &mut BytesMut) {
    put_envelope(TX_DMX_PACKET, universe.len(), universe.as_bytes(), dst);
}

fn put_envelope(label: u8, len: u16, payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(HEADER_SIZE + payload.len() + TRAILER_SIZE);
    dst.put_u8(START_MARKER);
    dst.put_u8(label);
    dst.put_u16_le(len);
    dst.put_slice(payload);
    dst.put_u8(END_MARKER);
}

/// Decode a packet from a stream buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete packet yet.
/// On success, consumes the packet bytes from the buffer.
pub fn decode_packet(src: &mut BytesMut, max_payload: usize) -> Result<Option<Packet>> {
    if src.is_empty() {
        return Ok(None);
    }
    if src[0] != START_MARKER {
        return Err(FrameError::Framing("missing start marker"));
    }
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let label = src[1];
    let payload_len = u16::from_le_bytes([src[2], src[3]]) as usize;
    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len + TRAILER_SIZE;
    if src.len() < total {
        return Ok(None); // Need more data
    }
    if src[total - 1] != END_MARKER {
        return Err(FrameError::Framing("missing end marker"));
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();
    src.advance(TRAILER_SIZE);

    Ok(Some(Packet { label, payload }))
}

/// Validate one complete packet held in `bytes`.
///
/// Unlike [`decode_packet`], the buffer must be exactly one packet: the
/// declared length has to match the bytes between header and end marker.
pub fn validate_packet(bytes: &[u8]) -> Result<Packet> {
    match (bytes.first(), bytes.last()) {
        (Some(&START_MARKER), Some(&END_MARKER)) => {}
        (Some(&START_MARKER), _) => return Err(FrameError::Framing("missing end marker")),
        _ => return Err(FrameError::Framing("missing start marker")),
    }
    if bytes.len() < HEADER_SIZE + TRAILER_SIZE {
        return Err(FrameError::Framing("truncated header"));
    }

    let declared = u16::from_le_bytes([bytes[2], bytes[3]]) as usize;
    let actual = bytes.len() - HEADER_SIZE - TRAILER_SIZE;
    if declared != actual {
        return Err(FrameError::LengthMismatch { declared, actual });
    }

    Ok(Packet::new(
        bytes[1],
        Bytes::copy_from_slice(&bytes[HEADER_SIZE..HEADER_SIZE + actual]),
    ))
}
