use std::io::{ErrorKind, Write};
use std::time::Duration;

use crate::config::DEFAULT_TIMEOUT;
use crate::error::{Result, TransportError};

/// A write-side link to a DMX widget.
///
/// Implementations must bound every write: a port that stops draining has
/// to surface [`TransportError::WriteTimeout`] instead of blocking forever.
pub trait DmxPort: Send {
    /// Write the whole buffer or fail.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Flush buffered bytes to the device.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Close the port. Closing twice is not an error.
    fn close(&mut self) -> Result<()>;

    /// Human-readable port name for diagnostics.
    fn name(&self) -> &str;
}

impl<P: DmxPort + ?Sized> DmxPort for Box<P> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Adapts any `std::io::Write` into a [`DmxPort`].
///
/// The stream's own timeout behavior is reported through `TimedOut` or
/// `WouldBlock`; both surface as [`TransportError::WriteTimeout`].
pub struct StreamPort<W> {
    inner: Option<W>,
    name: String,
    write_timeout: Duration,
}

impl<W: Write + Send> StreamPort<W> {
    /// Wrap a stream using the default write timeout for error reports.
    pub fn new(inner: W) -> Self {
        Self::with_timeout(inner, DEFAULT_TIMEOUT)
    }

    /// Wrap a stream whose write timeout is already configured to `write_timeout`.
    pub fn with_timeout(inner: W, write_timeout: Duration) -> Self {
        Self {
            inner: Some(inner),
            name: "stream".to_string(),
            write_timeout,
        }
    }

    /// Set the diagnostic name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Borrow the underlying stream, if the port is still open.
    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref()
    }

    /// Consume the port and return the inner stream, if still open.
    pub fn into_inner(self) -> Option<W> {
        self.inner
    }

    fn map_io(&self, err: std::io::Error) -> TransportError {
        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => {
                TransportError::WriteTimeout(self.write_timeout)
            }
            _ => TransportError::Port(err),
        }
    }
}

impl<W: Write + Send> DmxPort for StreamPort<W> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            let inner = self.inner.as_mut().ok_or(TransportError::Closed)?;
            match inner.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(self.map_io(err)),
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        loop {
            let inner = self.inner.as_mut().ok_or(TransportError::Closed)?;
            match inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(self.map_io(err)),
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut inner) = self.inner.take() {
            inner.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<W> std::fmt::Debug for StreamPort<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamPort")
            .field("name", &self.name)
            .field("open", &self.inner.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn writes_whole_buffer() {
        let mut port = StreamPort::new(Cursor::new(Vec::<u8>::new()));
        port.write_all(&[1, 2, 3]).unwrap();
        port.write_all(&[4]).unwrap();

        let wire = port.into_inner().unwrap().into_inner();
        assert_eq!(wire, vec![1, 2, 3, 4]);
    }

    #[test]
    fn continues_partial_writes() {
        let mut port = StreamPort::new(TrickleWriter::default());
        port.write_all(b"partial").unwrap();
        assert_eq!(port.get_ref().unwrap().data, b"partial");
    }

    #[test]
    fn retries_interrupted_write() {
        let mut port = StreamPort::new(InterruptOnce::default());
        port.write_all(b"retry").unwrap();
        assert_eq!(port.get_ref().unwrap().data, b"retry");
    }

    #[test]
    fn timed_out_stream_maps_to_write_timeout() {
        let timeout = Duration::from_millis(20);
        let mut port = StreamPort::with_timeout(FailingWriter(ErrorKind::TimedOut), timeout);
        let err = port.write_all(b"x").unwrap_err();
        assert!(matches!(err, TransportError::WriteTimeout(d) if d == timeout));
        assert!(err.is_timeout());
    }

    #[test]
    fn would_block_maps_to_write_timeout() {
        let mut port = StreamPort::new(FailingWriter(ErrorKind::WouldBlock));
        assert!(port.write_all(b"x").unwrap_err().is_timeout());
    }

    #[test]
    fn other_io_errors_map_to_port_error() {
        let mut port = StreamPort::new(FailingWriter(ErrorKind::BrokenPipe));
        let err = port.write_all(b"x").unwrap_err();
        assert!(matches!(err, TransportError::Port(ref io) if io.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    fn zero_length_write_means_closed() {
        let mut port = StreamPort::new(ZeroWriter);
        assert!(matches!(
            port.write_all(b"x").unwrap_err(),
            TransportError::Closed
        ));
    }

    #[test]
    fn write_after_close_fails() {
        let mut port = StreamPort::new(Cursor::new(Vec::<u8>::new())).named("loopback");
        assert_eq!(port.name(), "loopback");
        port.close().unwrap();
        port.close().unwrap();
        assert!(matches!(
            port.write_all(b"x").unwrap_err(),
            TransportError::Closed
        ));
    }

    #[test]
    fn boxed_port_delegates() {
        let mut port: Box<dyn DmxPort> = Box::new(StreamPort::new(Cursor::new(Vec::<u8>::new())));
        port.write_all(b"boxed").unwrap();
        port.flush().unwrap();
        assert_eq!(port.name(), "stream");
    }

    #[derive(Default)]
    struct TrickleWriter {
        data: Vec<u8>,
    }

    impl Write for TrickleWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let n = buf.len().min(2);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct InterruptOnce {
        interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct FailingWriter(ErrorKind);

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(self.0))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
