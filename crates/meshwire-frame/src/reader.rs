use bytes::{Buf, BytesMut};
use meshwire_transport::Transport;

use crate::codec::{DecoderStats, Frame, FrameConfig, FrameDecoder};
use crate::error::Result;

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 256;

/// Reads complete frames from a [`Transport`].
///
/// Bytes read past the end of a frame stay pending for the next call, so
/// frames are recovered identically however the transport chunks its reads.
pub struct FrameReader<T> {
    inner: T,
    decoder: FrameDecoder,
    pending: BytesMut,
}

impl<T: Transport> FrameReader<T> {
    /// Create a frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, &FrameConfig::default())
    }

    /// Create a frame reader with explicit configuration.
    pub fn with_config(inner: T, config: &FrameConfig) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::with_mtu(config.mtu),
            pending: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Read until a frame completes or the transport read times out.
    ///
    /// Returns `Ok(None)` when the transport had nothing to deliver, giving the
    /// caller a chance to check for shutdown. A partial frame is kept.
    pub fn poll_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.decode_pending() {
                return Ok(Some(frame));
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = self.inner.read(&mut chunk)?;
            if read == 0 {
                return Ok(None);
            }
            self.pending.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read the next complete frame (blocking).
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.poll_frame()? {
                return Ok(frame);
            }
        }
    }

    /// Bytes received but not yet fed to the decoder.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Decoder counters.
    pub fn stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn decode_pending(&mut self) -> Option<Frame> {
        let mut consumed = 0usize;
        let mut frame = None;
        for &byte in self.pending.iter() {
            consumed += 1;
            if let Some(done) = self.decoder.feed(byte) {
                frame = Some(done);
                break;
            }
        }
        self.pending.advance(consumed);
        frame
    }
}

impl<T> std::fmt::Debug for FrameReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("decoder", &self.decoder)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
