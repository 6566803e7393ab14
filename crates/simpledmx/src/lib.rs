//! Host-side driver for USB DMX widgets.
//!
//! simpledmx keeps one universe of channel levels in memory, frames it into
//! the widget's serial packet format and fades channels smoothly on a
//! background task.
//!
//! # Crate Structure
//!
//! - [`transport`] — Port abstraction and serial device access
//! - [`frame`] — Universe, widget labels and packet framing
//! - [`connection`] — Connection, fault handling and fades (behind `connection` feature)

/// Re-export transport types.
pub mod transport {
    pub use simpledmx_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use simpledmx_frame::*;
}

/// Re-export connection types (requires `connection` feature).
#[cfg(feature = "connection")]
pub mod connection {
    pub use simpledmx_connection::*;
}
