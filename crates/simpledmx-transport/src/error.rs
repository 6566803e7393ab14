use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur in port operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open or configure the device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The requested baud rate is not supported by the platform.
    #[error("unsupported baud rate {0}")]
    InvalidBaudRate(u32),

    /// The device did not accept the bytes within the write timeout.
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// An I/O error occurred on the port.
    #[error("port I/O error: {0}")]
    Port(#[from] std::io::Error),

    /// The port has been closed.
    #[error("port closed")]
    Closed,
}

impl TransportError {
    /// True when the failure was a write timeout rather than a hard error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::WriteTimeout(_))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
