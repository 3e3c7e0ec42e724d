use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(20);

#[derive(Debug, Default)]
struct DeviceFlags {
    absent: AtomicBool,
    fail_writes: AtomicBool,
}

/// In-process loopback link.
///
/// The host side implements [`Transport`]; the paired [`MemoryDevice`] plays
/// the radio. Used by simulators and tests that need a device without
/// hardware.
pub struct MemoryTransport {
    inbound: Receiver<Vec<u8>>,
    outbound: Sender<Vec<u8>>,
    pending: Mutex<Vec<u8>>,
    open: AtomicBool,
    flags: Arc<DeviceFlags>,
    read_timeout: Duration,
}

/// Device end of a [`MemoryTransport`].
#[derive(Clone)]
pub struct MemoryDevice {
    to_host: Sender<Vec<u8>>,
    from_host: Receiver<Vec<u8>>,
    flags: Arc<DeviceFlags>,
}

impl MemoryTransport {
    /// Create a connected host/device pair.
    pub fn pair() -> (Self, MemoryDevice) {
        let (to_host, inbound) = crossbeam_channel::unbounded();
        let (outbound, from_host) = crossbeam_channel::unbounded();
        let flags = Arc::new(DeviceFlags::default());

        let host = Self {
            inbound,
            outbound,
            pending: Mutex::new(Vec::new()),
            open: AtomicBool::new(false),
            flags: Arc::clone(&flags),
            read_timeout: DEFAULT_READ_TIMEOUT,
        };
        let device = MemoryDevice {
            to_host,
            from_host,
            flags,
        };
        (host, device)
    }

    /// Override how long a read waits for device bytes before returning 0.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(TransportError::NotOpen)
        }
    }
}

impl Transport for MemoryTransport {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn open(&self) -> Result<()> {
        if self.flags.absent.load(Ordering::Acquire) {
            return Err(TransportError::Open {
                path: "memory".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "device absent"),
            });
        }
        self.open.store(true, Ordering::Release);
        debug!("opened memory transport");
        Ok(())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(0);
        }

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.is_empty() {
            match self.inbound.recv_timeout(self.read_timeout) {
                Ok(chunk) => *pending = chunk,
                Err(RecvTimeoutError::Timeout) => return Ok(0),
                Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Disconnected),
            }
        }

        let n = pending.len().min(buf.len());
        buf[..n].copy_from_slice(&pending[..n]);
        pending.drain(..n);
        Ok(n)
    }

    fn write_all(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_open()?;
        if self.flags.fail_writes.load(Ordering::Acquire) {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device rejected write",
            )));
        }
        self.outbound
            .send(bytes.to_vec())
            .map_err(|_| TransportError::Disconnected)
    }

    fn flush(&self) -> Result<()> {
        self.ensure_open()
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            debug!("closed memory transport");
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("open", &self.is_open())
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

impl MemoryDevice {
    /// Deliver raw bytes to the host, as if the radio had sent them.
    pub fn inject(&self, bytes: &[u8]) -> Result<()> {
        self.to_host
            .send(bytes.to_vec())
            .map_err(|_| TransportError::Disconnected)
    }

    /// Wait for the next chunk the host wrote.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Vec<u8>> {
        self.from_host.recv_timeout(timeout).ok()
    }

    /// Make subsequent `open` calls on the host fail, as if unplugged.
    pub fn set_absent(&self, absent: bool) {
        self.flags.absent.store(absent, Ordering::Release);
    }

    /// Make subsequent host writes fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.flags.fail_writes.store(fail, Ordering::Release);
    }
}

impl std::fmt::Debug for MemoryDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDevice").finish_non_exhaustive()
    }
}
