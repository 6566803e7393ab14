//! Fade a few channels up and back down on a real widget.
//!
//! Run with:
//!   cargo run --example fade -- /dev/ttyUSB0
//!
//! Pass `debug` or `trace` as a second argument for per-tick logging.

use std::time::Duration;

use simpledmx::connection::{ConnectionConfig, DmxConnection, SuppressFaults};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let device = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let level = match args.next().as_deref() {
        Some("trace") => tracing::Level::TRACE,
        Some("debug") => tracing::Level::DEBUG,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false)
        .init();

    let config = ConnectionConfig {
        num_channels: 24,
        ..ConnectionConfig::default()
    };
    let conn = match DmxConnection::open(&device, config) {
        Ok(conn) => conn.with_fault_handler(SuppressFaults),
        Err(err) => {
            eprintln!("Could not open {device}: {err}");
            return Err(err.into());
        }
    };

    conn.clear(None)?;
    conn.render()?;

    eprintln!("Fading channels 1-3 up");
    conn.ramp(&[1, 2, 3], &[255, 128, 64], Duration::from_secs(2))?;
    std::thread::sleep(Duration::from_millis(500));

    // Interrupt the first fade halfway through; it stops where it is.
    eprintln!("Superseding with a fade down");
    conn.ramp(&[1, 2, 3], &[0, 0, 0], Duration::from_secs(1))?;
    conn.wait_for_ramp();

    if let Some(err) = conn.take_last_error() {
        eprintln!("Fade reported: {err}");
    }
    eprintln!("Final levels: {:?}", &conn.frame()[..3]);

    conn.close()?;
    Ok(())
}
