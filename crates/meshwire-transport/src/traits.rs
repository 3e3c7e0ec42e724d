use std::sync::Arc;

use crate::error::Result;

/// An ordered, error-reporting byte stream to a radio.
///
/// Implementations are shared between a reader thread and writers, so every
/// method takes `&self`; implementations serialize access internally. Reads and
/// writes must not block each other.
pub trait Transport: Send + Sync {
    /// Transport name for diagnostics.
    fn name(&self) -> &'static str;

    /// Open the underlying link. Opening an already open link is a no-op.
    fn open(&self) -> Result<()>;

    /// Read available bytes into `buf`.
    ///
    /// Returns `Ok(0)` when the read timed out with nothing available, so
    /// callers get a chance to observe shutdown requests.
    fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Write every byte of `bytes`.
    fn write_all(&self, bytes: &[u8]) -> Result<()>;

    /// Flush buffered output to the device.
    fn flush(&self) -> Result<()>;

    /// Release the link. Subsequent reads and writes fail with `NotOpen`.
    fn close(&self);

    /// Whether the link is currently open.
    fn is_open(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn open(&self) -> Result<()> {
        (**self).open()
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write_all(&self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn close(&self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn open(&self) -> Result<()> {
        (**self).open()
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write_all(&self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn close(&self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn open(&self) -> Result<()> {
        (**self).open()
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write_all(&self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn close(&self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}
