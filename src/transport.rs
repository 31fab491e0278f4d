//! Byte-oriented duplex transport beneath the OPUP framing layer.

use std::io::{Read as _, Write as _};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::{Error, Result};

/// A bounded-timeout, byte-oriented duplex channel.
///
/// `read` returns fewer than `buf.len()` octets iff the timeout elapsed
/// before the rest arrived; the framing layer treats a short read as fatal
/// to the current transaction.
pub trait Transport {
    /// Writes `bytes` in full.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Reads up to `buf.len()` octets, returning the number actually read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Discards whatever is currently sitting in the input buffer.
    fn flush_input(&mut self) -> Result<()>;

    /// Closes the transport. Idempotent: closing an already-closed transport
    /// succeeds silently.
    fn close(&mut self) -> Result<()>;
}

/// Real serial-port transport, backed by the host's serial driver.
pub struct SerialTransport {
    port: Option<Box<dyn serialport::SerialPort>>,
    timeout: Duration,
}

impl SerialTransport {
    /// Opens `port_name` at `baud`, 8-N-1, with `timeout` applied to every
    /// read. Waits ~500ms for the device to reset, then flushes whatever
    /// landed in the input buffer during that window.
    pub fn open(port_name: &str, baud: u32, timeout: Duration) -> Result<Self> {
        debug!("opening serial transport on {port_name} at {baud} baud");
        let port = serialport::new(port_name, baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(timeout)
            .open()
            .map_err(|e| Error::TransportUnavailable(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        let mut this = Self { port: Some(port), timeout };
        std::thread::sleep(Duration::from_millis(500));
        this.flush_input()?;
        Ok(this)
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or_else(|| {
            Error::TransportUnavailable(std::io::Error::new(std::io::ErrorKind::NotConnected, "transport closed"))
        })?;
        port.write_all(bytes)?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        // A single underlying `read()` commonly returns a partial chunk well
        // before the overall timeout, simply because the rest of the bytes
        // haven't arrived at the kernel buffer yet. Loop until `buf` is full
        // or the deadline passes, so a short read here really does mean the
        // timeout elapsed, not that one syscall happened to be early.
        let deadline = Instant::now() + self.timeout;
        let port = self.port.as_mut().ok_or_else(|| {
            Error::TransportUnavailable(std::io::Error::new(std::io::ErrorKind::NotConnected, "transport closed"))
        })?;
        let mut read = 0;
        while read < buf.len() {
            match port.read(&mut buf[read..]) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) => return Err(Error::TransportUnavailable(e)),
            }
            if Instant::now() >= deadline {
                break;
            }
        }
        Ok(read)
    }

    fn flush_input(&mut self) -> Result<()> {
        let port = self.port.as_mut().ok_or_else(|| {
            Error::TransportUnavailable(std::io::Error::new(std::io::ErrorKind::NotConnected, "transport closed"))
        })?;
        port.clear(serialport::ClearBuffer::Input)
            .map_err(|e| Error::TransportUnavailable(std::io::Error::new(std::io::ErrorKind::Other, e)))
    }

    fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            debug!("closed serial transport");
        } else {
            warn!("close called on an already-closed transport");
        }
        Ok(())
    }
}

/// An in-memory transport for exercising the framing layer without
/// hardware: writes are recorded, reads are served from a pre-scripted
/// byte queue.
#[cfg(test)]
pub struct MockTransport {
    pub written: Vec<u8>,
    pub to_read: std::collections::VecDeque<u8>,
    pub closed: bool,
}

#[cfg(test)]
impl MockTransport {
    pub fn new(script: &[u8]) -> Self {
        Self {
            written: Vec::new(),
            to_read: script.iter().copied().collect(),
            closed: false,
        }
    }
}

#[cfg(test)]
impl Transport for MockTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.written.extend_from_slice(bytes);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            match self.to_read.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn flush_input(&mut self) -> Result<()> {
        self.to_read.clear();
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
