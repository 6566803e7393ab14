//! DMX channel frame and widget packet framing.
//!
//! Every packet sent to a USB DMX widget is framed with:
//! - A start marker (`0x7E`)
//! - A 1-byte message label
//! - A 2-byte little-endian payload length
//! - The payload, then an end marker (`0xE7`)
//!
//! The [`Universe`] holds the channel intensities that the `TX_DMX_PACKET`
//! message carries.

pub mod codec;
pub mod error;
pub mod label;
pub mod reader;
pub mod universe;
pub mod writer;

pub use codec::{
    decode_packet, encode_packet, encode_universe, validate_packet, Packet, END_MARKER,
    HEADER_SIZE, MAX_PAYLOAD, START_MARKER, TRAILER_SIZE,
};
pub use error::{FrameError, Result};
pub use label::{
    is_known, label_name, GET_WIDGET_PARAMETERS, RX_DMX_ON_CHANGE, RX_DMX_PACKET,
    SET_WIDGET_PARAMETERS, TX_DMX_PACKET, TX_RDM_PACKET_REQUEST,
};
pub use reader::PacketReader;
pub use universe::{Universe, MAX_CHANNELS};
pub use writer::PacketWriter;
