use simpledmx_transport::TransportError;

/// Errors that can occur on the frame and packet layer.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A channel id outside `1..=max` was addressed.
    #[error("channel {channel} out of range (valid: 1..={max})")]
    ChannelOutOfRange { channel: u16, max: u16 },

    /// A universe was requested with an unsupported channel count.
    #[error("invalid channel count {0} (valid: 1..=512)")]
    InvalidChannelCount(usize),

    /// The packet envelope markers are wrong.
    #[error("packet framing error: {0}")]
    Framing(&'static str),

    /// The declared payload length disagrees with the bytes present.
    #[error("declared payload length {declared} does not match actual {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The port failed while writing a packet.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// An I/O error occurred while reading packets.
    #[error("packet I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete packet was received.
    #[error("connection closed (incomplete packet)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
