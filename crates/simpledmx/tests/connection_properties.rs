#![cfg(feature = "connection")]

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use simpledmx::connection::{ConnectionConfig, Decision, DmxConnection, DmxError};
use simpledmx::frame::{FrameError, PacketReader, TX_DMX_PACKET};
use simpledmx::transport::{DmxPort, TransportError};

/// Captures the raw byte stream, optionally failing every write.
#[derive(Clone, Default)]
struct WirePort {
    bytes: Arc<Mutex<Vec<u8>>>,
    fail: Arc<AtomicBool>,
}

impl WirePort {
    fn packets(&self) -> Vec<Vec<u8>> {
        let wire = self.bytes.lock().unwrap().clone();
        let mut reader = PacketReader::new(Cursor::new(wire));
        let mut packets = Vec::new();
        loop {
            match reader.read_packet() {
                Ok(packet) => {
                    assert_eq!(packet.label, TX_DMX_PACKET);
                    packets.push(packet.payload.to_vec());
                }
                Err(FrameError::ConnectionClosed) => return packets,
                Err(err) => panic!("malformed wire data: {err}"),
            }
        }
    }
}

impl DmxPort for WirePort {
    fn write_all(&mut self, bytes: &[u8]) -> simpledmx::transport::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::WriteTimeout(Duration::from_millis(5)));
        }
        self.bytes.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }

    fn close(&mut self) -> simpledmx::transport::Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "wire"
    }
}

fn connect(channels: u16) -> (DmxConnection, WirePort) {
    let port = WirePort::default();
    let config = ConnectionConfig {
        num_channels: channels,
        ..ConnectionConfig::default()
    };
    let conn = DmxConnection::with_port(port.clone(), config).expect("connection should build");
    (conn, port)
}

#[test]
fn set_read_clear_properties() {
    let (conn, _port) = connect(32);
    for chan in 1..=32u16 {
        for val in [-50, -1, 0, 1, 127, 254, 255, 256, 300] {
            conn.set_channel(chan, val).unwrap();
            assert_eq!(i32::from(conn.read_channel(chan).unwrap()), val.clamp(0, 255));
        }
    }

    conn.clear(Some(5)).unwrap();
    assert_eq!(conn.read_channel(5).unwrap(), 0);
    assert_eq!(conn.read_channel(6).unwrap(), 255);

    conn.clear(None).unwrap();
    assert!(conn.frame().iter().all(|&level| level == 0));

    for chan in [0u16, 33, 1000] {
        assert!(matches!(
            conn.set_channel(chan, 1),
            Err(DmxError::Frame(FrameError::ChannelOutOfRange { .. }))
        ));
    }
}

#[test]
fn rendered_packets_carry_the_frame() {
    let (conn, port) = connect(5);
    conn.set_channel(1, 10).unwrap();
    conn.set_channel(5, 50).unwrap();
    conn.render().unwrap();

    let wire = port.bytes.lock().unwrap().clone();
    assert_eq!(wire.len(), 5 + 5);
    assert_eq!(wire[0], 0x7E);
    assert_eq!(wire[1], 0x06);
    assert_eq!(u16::from_le_bytes([wire[2], wire[3]]), 5);
    assert_eq!(&wire[4..9], &[10, 0, 0, 0, 50]);
    assert_eq!(wire[9], 0xE7);
}

#[test]
fn one_second_ramp_lands_on_target() {
    let (conn, port) = connect(8);
    let started = Instant::now();
    conn.ramp(&[3], &[200], Duration::from_secs(1)).unwrap();
    assert!(started.elapsed() < Duration::from_millis(200), "ramp must not block");

    conn.wait_for_ramp();
    let elapsed = started.elapsed();

    assert_eq!(conn.read_channel(3).unwrap(), 200);
    assert!(elapsed >= Duration::from_millis(900), "finished too early: {elapsed:?}");

    let packets = port.packets();
    assert_eq!(packets.len(), 256);
    let levels: Vec<u8> = packets.iter().map(|payload| payload[2]).collect();
    assert!(levels.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(levels.last(), Some(&200));
}

#[test]
fn superseded_ramp_never_reaches_its_target() {
    let (conn, port) = connect(1);
    let started = Instant::now();

    conn.ramp(&[1], &[100], Duration::from_secs(10)).unwrap();
    conn.ramp(&[1], &[50], Duration::from_millis(10)).unwrap();
    conn.wait_for_ramp();

    assert_eq!(conn.read_channel(1).unwrap(), 50);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(port.packets().iter().all(|payload| payload[0] < 100));
}

#[test]
fn hammering_ramp_keeps_one_loop() {
    let (conn, _port) = connect(4);
    let conn = Arc::new(conn);
    let stop = Arc::new(AtomicBool::new(false));
    let peak = Arc::new(AtomicUsize::new(0));

    let sampler = {
        let conn = Arc::clone(&conn);
        let stop = Arc::clone(&stop);
        let peak = Arc::clone(&peak);
        thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                peak.fetch_max(conn.engine().active_runs(), Ordering::SeqCst);
            }
        })
    };

    let callers: Vec<_> = (0..4u16)
        .map(|worker| {
            let conn = Arc::clone(&conn);
            thread::spawn(move || {
                for i in 0..20 {
                    conn.ramp(&[worker + 1], &[i * 10], Duration::from_millis(20))
                        .unwrap();
                }
            })
        })
        .collect();
    for caller in callers {
        caller.join().unwrap();
    }
    conn.wait_for_ramp();
    stop.store(true, Ordering::SeqCst);
    sampler.join().unwrap();

    assert!(peak.load(Ordering::SeqCst) <= 1);
    assert_eq!(conn.engine().active_runs(), 0);
}

#[test]
fn render_failure_propagates_unless_suppressed() {
    let (conn, port) = connect(2);
    port.fail.store(true, Ordering::SeqCst);
    conn.set_channel(1, 7).unwrap();

    let err = conn.render().unwrap_err();
    assert!(matches!(
        err,
        DmxError::Transport(TransportError::WriteTimeout(_))
    ));

    conn.set_fault_handler(|_: &TransportError| Decision::Suppress);
    conn.render().unwrap();
    assert_eq!(conn.frame(), vec![7, 0]);
}

#[test]
fn ramp_after_port_recovers() {
    let (conn, port) = connect(1);
    port.fail.store(true, Ordering::SeqCst);
    conn.ramp(&[1], &[255], Duration::from_millis(20)).unwrap();
    conn.wait_for_ramp();
    assert!(conn.take_last_error().is_some());

    port.fail.store(false, Ordering::SeqCst);
    conn.ramp(&[1], &[255], Duration::from_millis(20)).unwrap();
    conn.wait_for_ramp();
    assert!(conn.take_last_error().is_none());
    assert_eq!(conn.read_channel(1).unwrap(), 255);
}
