//! Byte-stream port abstraction for USB DMX widgets.
//!
//! Provides a unified write-side interface over the link to the widget:
//! - Serial (tty) devices on Unix, with a bounded write timeout
//! - Any `std::io::Write` stream, for tests and bridging
//!
//! This is the lowest layer of simpledmx. Everything else builds on top of
//! the [`DmxPort`] trait provided here.

pub mod config;
pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use config::{PortConfig, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT};
pub use error::{Result, TransportError};
pub use traits::{DmxPort, StreamPort};

#[cfg(unix)]
pub use serial::SerialPort;
