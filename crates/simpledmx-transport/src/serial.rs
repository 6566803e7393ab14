use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::PortConfig;
use crate::error::{Result, TransportError};
use crate::traits::DmxPort;

/// Serial (tty) link to a USB DMX widget.
///
/// The device is opened non-blocking in raw 8N1 mode. Every write waits for
/// the device to drain with `poll(2)` and gives up after the configured
/// write timeout, so a wedged widget cannot stall the caller indefinitely.
pub struct SerialPort {
    file: Option<File>,
    path: PathBuf,
    name: String,
    write_timeout: Duration,
}

impl SerialPort {
    /// Open and configure a serial device (e.g. `/dev/ttyUSB0`).
    pub fn open(path: impl AsRef<Path>, config: &PortConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let speed = baud_constant(config.baud_rate)
            .ok_or(TransportError::InvalidBaudRate(config.baud_rate))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(&path)
            .map_err(|source| TransportError::Open {
                path: path.clone(),
                source,
            })?;

        configure_raw(&file, speed, config.read_timeout).map_err(|source| {
            TransportError::Open {
                path: path.clone(),
                source,
            }
        })?;
        debug!(?path, baud = config.baud_rate, "configured serial line");

        info!(?path, "opened serial port");
        Ok(Self {
            file: Some(file),
            name: path.display().to_string(),
            path,
            write_timeout: config.write_timeout,
        })
    }

    /// The device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the port is still open.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

impl DmxPort for SerialPort {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let timeout = self.write_timeout;
        let file = self.file.as_mut().ok_or(TransportError::Closed)?;
        let deadline = Instant::now() + timeout;

        let mut offset = 0usize;
        while offset < bytes.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !poll_writable(file, remaining)? {
                warn!(path = ?self.path, ?timeout, "serial write timed out");
                return Err(TransportError::WriteTimeout(timeout));
            }
            match file.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Port(err)),
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.file.take().is_some() {
            info!(path = ?self.path, "closed serial port");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SerialPort {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.path)
            .field("open", &self.file.is_some())
            .field("write_timeout", &self.write_timeout)
            .finish()
    }
}

fn baud_constant(baud_rate: u32) -> Option<libc::speed_t> {
    let speed = match baud_rate {
        9_600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        57_600 => libc::B57600,
        115_200 => libc::B115200,
        230_400 => libc::B230400,
        _ => return None,
    };
    Some(speed)
}

fn configure_raw(file: &File, speed: libc::speed_t, read_timeout: Duration) -> std::io::Result<()> {
    let fd = file.as_raw_fd();

    // SAFETY: termios is a plain C struct; all-zero is a valid value that
    // tcgetattr fully overwrites before use.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: `fd` is an open descriptor owned by `file` and `tio` is a
    // valid writable termios for the duration of each call.
    unsafe {
        if libc::tcgetattr(fd, &mut tio) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        libc::cfmakeraw(&mut tio);
        if libc::cfsetispeed(&mut tio, speed) != 0 || libc::cfsetospeed(&mut tio, speed) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }

    tio.c_cflag |= libc::CLOCAL | libc::CREAD;
    tio.c_cflag &= !(libc::CSTOPB | libc::PARENB | libc::CRTSCTS);
    tio.c_cc[libc::VMIN] = 0;
    // VTIME counts deciseconds and saturates at 25.5s.
    tio.c_cc[libc::VTIME] = u8::try_from(read_timeout.as_millis() / 100).unwrap_or(u8::MAX);

    // SAFETY: see above.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Wait until the device accepts more bytes. Returns `false` on timeout.
fn poll_writable(file: &File, timeout: Duration) -> Result<bool> {
    let mut pfd = libc::pollfd {
        fd: file.as_raw_fd(),
        events: libc::POLLOUT,
        revents: 0,
    };
    let millis = timeout.as_millis().clamp(1, i32::MAX as u128) as libc::c_int;

    loop {
        // SAFETY: `pfd` is a valid pollfd array of length 1 for the call.
        let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == ErrorKind::Interrupted {
                continue;
            }
            return Err(TransportError::Port(err));
        }
        if rc == 0 {
            return Ok(false);
        }
        if pfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
            return Err(TransportError::Port(std::io::Error::from(
                ErrorKind::BrokenPipe,
            )));
        }
        return Ok(true);
    }
}
