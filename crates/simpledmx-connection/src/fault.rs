//! Policy hook for port failures during render.
//!
//! The core never retries a write. What happens after a failure (surface it,
//! ignore it, power-cycle the widget) is the fault handler's call.

use simpledmx_transport::TransportError;
use tracing::warn;

/// What the core should do with a failed render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Fail the render with the transport error.
    Propagate,
    /// Treat the render as successful.
    Suppress,
    /// The handler started external recovery; the next render is the retry.
    RecoverAndRetry,
}

/// Decides the fate of a failed render.
///
/// Invoked from whichever thread rendered: the caller's for
/// [`render`](crate::DmxConnection::render), the fade thread during a ramp.
pub trait FaultHandler: Send + Sync {
    fn handle(&self, err: &TransportError) -> Decision;
}

impl<F> FaultHandler for F
where
    F: Fn(&TransportError) -> Decision + Send + Sync,
{
    fn handle(&self, err: &TransportError) -> Decision {
        self(err)
    }
}

/// Surfaces every failure. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropagateFaults;

impl FaultHandler for PropagateFaults {
    fn handle(&self, _err: &TransportError) -> Decision {
        Decision::Propagate
    }
}

/// Logs and swallows every failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuppressFaults;

impl FaultHandler for SuppressFaults {
    fn handle(&self, err: &TransportError) -> Decision {
        warn!(error = %err, "suppressing render failure");
        Decision::Suppress
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn builtin_policies() {
        let err = TransportError::WriteTimeout(Duration::from_millis(5));
        assert_eq!(PropagateFaults.handle(&err), Decision::Propagate);
        assert_eq!(SuppressFaults.handle(&err), Decision::Suppress);
    }

    #[test]
    fn closures_are_handlers() {
        let handler = |err: &TransportError| {
            if err.is_timeout() {
                Decision::RecoverAndRetry
            } else {
                Decision::Propagate
            }
        };
        assert_eq!(
            handler.handle(&TransportError::WriteTimeout(Duration::ZERO)),
            Decision::RecoverAndRetry
        );
        assert_eq!(handler.handle(&TransportError::Closed), Decision::Propagate);
    }
}
