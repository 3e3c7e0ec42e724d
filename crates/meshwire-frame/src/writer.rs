use bytes::{BufMut, BytesMut};
use meshwire_transport::Transport;
use tracing::debug;

use crate::codec::{encode_header, FrameConfig, HEADER_SIZE, MTU, WAKE_PREAMBLE};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = HEADER_SIZE + MTU;

/// Writes complete frames to a [`Transport`].
///
/// Every frame is preceded by the wake preamble and the configured settle
/// delay, then written as header + payload and flushed.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Transport> FrameWriter<T> {
    /// Create a frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Frame and send one payload (blocking for the wake delay).
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        let max = self.config.mtu.min(MTU);
        if payload.len() > max {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max,
            });
        }

        debug!("writing wake preamble");
        self.inner.write_all(&WAKE_PREAMBLE)?;
        self.inner.flush()?;
        if !self.config.wake_delay.is_zero() {
            std::thread::sleep(self.config.wake_delay);
        }

        self.buf.clear();
        encode_header(payload.len(), &mut self.buf);
        self.buf.put_slice(payload);

        debug!(packet_len = payload.len(), "writing frame");
        self.inner.write_all(&self.buf)?;
        self.inner.flush()?;
        Ok(())
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<T> std::fmt::Debug for FrameWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use meshwire_transport::{MemoryDevice, MemoryTransport, TransportError};

    use super::*;
    use crate::codec::{encode_frame, FrameDecoder, MTU};

    fn no_delay() -> FrameConfig {
        FrameConfig {
            wake_delay: Duration::ZERO,
            ..FrameConfig::default()
        }
    }

    fn open_pair() -> (MemoryTransport, MemoryDevice) {
        let (host, device) = MemoryTransport::pair();
        host.open().unwrap();
        (host, device)
    }

    fn drain(device: &MemoryDevice) -> Vec<Vec<u8>> {
        let mut chunks = Vec::new();
        while let Some(chunk) = device.recv_timeout(Duration::from_millis(10)) {
            chunks.push(chunk);
        }
        chunks
    }

    #[test]
    fn preamble_is_written_separately() {
        let (host, device) = open_pair();
        let mut writer = FrameWriter::with_config(host, no_delay());
        writer.send(b"hi").unwrap();

        let chunks = drain(&device);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], WAKE_PREAMBLE);
        assert_eq!(chunks[1], vec![0x94, 0xC3, 0x00, 0x02, b'h', b'i']);
    }

    #[test]
    fn written_bytes_match_encoder() {
        let (host, device) = open_pair();
        let mut writer = FrameWriter::with_config(host, no_delay());
        writer.send(b"payload").unwrap();

        let written: Vec<u8> = drain(&device).concat();
        let mut expected = BytesMut::new();
        encode_frame(b"payload", &mut expected);
        assert_eq!(written, expected.to_vec());
    }

    #[test]
    fn written_bytes_decode() {
        let (host, device) = open_pair();
        let mut writer = FrameWriter::with_config(host, no_delay());
        writer.send(b"one").unwrap();
        writer.send(b"two").unwrap();

        let frames = FrameDecoder::new().feed_slice(&drain(&device).concat());
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].payload(), b"one");
        assert_eq!(frames[1].payload(), b"two");
    }

    #[test]
    fn payload_too_large_rejected() {
        let (host, device) = open_pair();
        let mut writer = FrameWriter::with_config(host, no_delay());

        let err = writer.send(&vec![0u8; MTU + 1]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge { size, max } if size == MTU + 1 && max == MTU
        ));
        assert!(drain(&device).is_empty(), "nothing may reach the wire");
    }

    #[test]
    fn payload_at_mtu_accepted() {
        let (host, _device) = open_pair();
        let mut writer = FrameWriter::with_config(host, no_delay());
        writer.send(&vec![0u8; MTU]).unwrap();
    }

    #[test]
    fn configured_mtu_is_capped() {
        let (host, device) = open_pair();
        let cfg = FrameConfig {
            mtu: 70_000,
            ..no_delay()
        };
        let mut writer = FrameWriter::with_config(host, cfg);

        let err = writer.send(&vec![0u8; 66_000]).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { max, .. } if max == MTU));
        assert!(drain(&device).is_empty());
    }

    #[test]
    fn wake_delay_is_observed() {
        let (host, _device) = open_pair();
        let cfg = FrameConfig {
            wake_delay: Duration::from_millis(30),
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(host, cfg);

        let start = Instant::now();
        writer.send(b"x").unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn write_failure_propagates() {
        let (host, device) = open_pair();
        device.set_fail_writes(true);
        let mut writer = FrameWriter::with_config(host, no_delay());

        let err = writer.send(b"x").unwrap_err();
        assert!(matches!(err, FrameError::Transport(TransportError::Io(_))));
    }

    #[test]
    fn unopened_transport_rejected() {
        let (host, _device) = MemoryTransport::pair();
        let mut writer = FrameWriter::with_config(host, no_delay());
        let err = writer.send(b"x").unwrap_err();
        assert!(matches!(
            err,
            FrameError::Transport(TransportError::NotOpen)
        ));
    }

    #[test]
    fn accessors_and_into_inner() {
        let (host, _device) = open_pair();
        let writer = FrameWriter::new(host);
        assert_eq!(writer.config().mtu, MTU);
        assert!(writer.get_ref().is_open());
        let _inner = writer.into_inner();
    }
}
