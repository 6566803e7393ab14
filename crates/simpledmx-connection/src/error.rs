use simpledmx_frame::FrameError;
use simpledmx_transport::TransportError;

/// Errors that can occur on a connection.
#[derive(Debug, thiserror::Error)]
pub enum DmxError {
    /// Frame or packet error (bad channel id, malformed packet).
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Port failure that the fault handler chose to propagate.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The ramp request itself is malformed.
    #[error("invalid ramp: {0}")]
    InvalidRamp(String),

    /// The connection configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The background fade task could not be started or died.
    #[error("fade engine failed: {0}")]
    EngineFailed(String),
}

impl DmxError {
    /// The transport failure behind this error, if any.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            DmxError::Transport(err) | DmxError::Frame(FrameError::Transport(err)) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DmxError>;
