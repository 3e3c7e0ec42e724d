use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

/// First start byte. Also the wake byte repeated in the preamble.
pub const START1: u8 = 0x94;

/// Second start byte.
pub const START2: u8 = 0xC3;

/// Maximum payload length the radio accepts.
pub const MTU: usize = 512;

/// Wake-up sequence written before every outbound frame.
pub const WAKE_PREAMBLE: [u8; 4] = [START1; 4];

/// Frame header: START1 (1) + START2 (1) + length (2, big-endian) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// How long the device needs after the wake preamble before it reads a header.
pub const DEFAULT_WAKE_DELAY: Duration = Duration::from_millis(100);

/// One complete payload recovered from the byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    payload: Bytes,
}

impl Frame {
    /// Create a frame around `payload`.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// The frame payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take the payload out of the frame.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Bytes this frame occupies on the wire, wake preamble included.
    pub fn wire_size(&self) -> usize {
        WAKE_PREAMBLE.len() + HEADER_SIZE + self.payload.len()
    }
}

/// Configuration for frame encoding and decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 512.
    pub mtu: usize,
    /// Pause between the wake preamble and the header. Default: 100 ms.
    pub wake_delay: Duration,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            mtu: MTU,
            wake_delay: DEFAULT_WAKE_DELAY,
        }
    }
}

/// Where the decoder is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Hunting for START1.
    Idle,
    /// Saw START1; expecting START2 (or more START1).
    SawStart1,
    /// Header found; next byte is the length high byte.
    HaveLenMsb,
    /// Next byte is the length low byte.
    HaveLenLsb,
    /// Collecting payload bytes.
    Buffering,
}

/// Counters kept by a [`FrameDecoder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames emitted.
    pub frames: u64,
    /// Headers dropped because they declared a length above the MTU.
    pub discarded: u64,
}

/// Incremental, self-synchronizing frame decoder.
///
/// Feed it one byte at a time; it emits a [`Frame`] when a payload completes.
/// Noise between frames is skipped, runs of START1 are absorbed, and headers
/// declaring more than the MTU are dropped silently.
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecoderState,
    len_msb: u8,
    target: usize,
    buf: BytesMut,
    mtu: usize,
    stats: DecoderStats,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder with the default MTU.
    pub fn new() -> Self {
        Self::with_mtu(MTU)
    }

    /// Create a decoder that rejects frames longer than `mtu`.
    ///
    /// `mtu` can only lower the limit; values above [`MTU`] are capped.
    pub fn with_mtu(mtu: usize) -> Self {
        Self {
            state: DecoderState::Idle,
            len_msb: 0,
            target: 0,
            buf: BytesMut::new(),
            mtu: mtu.min(MTU),
            stats: DecoderStats::default(),
        }
    }

    /// Consume one byte; returns a frame when it completes one.
    pub fn feed(&mut self, byte: u8) -> Option<Frame> {
        match self.state {
            DecoderState::Idle => {
                if byte == START1 {
                    self.state = DecoderState::SawStart1;
                }
                None
            }
            DecoderState::SawStart1 => {
                match byte {
                    START1 => {}
                    START2 => self.state = DecoderState::HaveLenMsb,
                    _ => self.reset(),
                }
                None
            }
            DecoderState::HaveLenMsb => {
                self.len_msb = byte;
                self.state = DecoderState::HaveLenLsb;
                None
            }
            DecoderState::HaveLenLsb => {
                let len = usize::from(u16::from_be_bytes([self.len_msb, byte]));
                if len > self.mtu {
                    debug!(packet_len = len, mtu = self.mtu, "dropping oversized frame header");
                    self.stats.discarded += 1;
                    self.reset();
                    return None;
                }
                if len == 0 {
                    self.reset();
                    return Some(self.emit(Bytes::new()));
                }
                debug!(packet_len = len, "frame header received, buffering");
                self.target = len;
                self.buf = BytesMut::with_capacity(len);
                self.state = DecoderState::Buffering;
                None
            }
            DecoderState::Buffering => {
                self.buf.put_u8(byte);
                if self.buf.len() < self.target {
                    return None;
                }
                let payload = std::mem::take(&mut self.buf).freeze();
                self.reset();
                Some(self.emit(payload))
            }
        }
    }

    /// Feed a whole chunk, collecting every frame it completes.
    pub fn feed_slice(&mut self, bytes: &[u8]) -> Vec<Frame> {
        bytes.iter().filter_map(|&byte| self.feed(byte)).collect()
    }

    /// Current state.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Payload bytes collected for the frame in progress.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Decoder counters.
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Drop any partial frame and return to `Idle`.
    pub fn reset(&mut self) {
        self.state = DecoderState::Idle;
        self.len_msb = 0;
        self.target = 0;
        self.buf.clear();
    }

    fn emit(&mut self, payload: Bytes) -> Frame {
        self.stats.frames += 1;
        Frame { payload }
    }
}

/// Write the 4-byte header for a payload of `len` bytes.
pub fn encode_header(len: usize, dst: &mut BytesMut) {
    debug_assert!(len <= usize::from(u16::MAX), "frame length must fit in u16");
    dst.reserve(HEADER_SIZE);
    dst.put_u8(START1);
    dst.put_u8(START2);
    dst.put_u16(len as u16);
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────┬────────┬────────┬──────────┬─────────────────┐
/// │ Wake (4B)        │ START1 │ START2 │ Length   │ Payload         │
/// │ 0x94 0x94 0x94.. │ 0x94   │ 0xC3   │ (2B BE)  │ (Length bytes)  │
/// └──────────────────┴────────┴────────┴──────────┴─────────────────┘
/// ```
///
/// The MTU is not checked here; [`FrameWriter`](crate::FrameWriter) enforces it.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(WAKE_PREAMBLE.len() + HEADER_SIZE + payload.len());
    dst.put_slice(&WAKE_PREAMBLE);
    encode_header(payload.len(), dst);
    dst.put_slice(payload);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_frame(payload, &mut buf);
        buf
    }

    #[test]
    fn encode_layout() {
        let wire = encoded(&[0xAA, 0xBB, 0xCC]);
        assert_eq!(
            wire.as_ref(),
            &[0x94, 0x94, 0x94, 0x94, 0x94, 0xC3, 0x00, 0x03, 0xAA, 0xBB, 0xCC]
        );
    }

    #[test]
    fn encode_length_is_big_endian() {
        let wire = encoded(&vec![0u8; 300]);
        assert_eq!(&wire[6..8], &[0x01, 0x2C]);
        assert_eq!(wire.len(), 4 + HEADER_SIZE + 300);
    }

    #[test]
    fn roundtrip_recovers_exactly_one_frame() {
        for payload in [vec![], vec![0x42], b"hello radio".to_vec(), vec![0x94; MTU]] {
            let frames = FrameDecoder::new().feed_slice(&encoded(&payload));
            assert_eq!(frames, vec![Frame::new(payload.clone())]);
        }
    }

    #[test]
    fn byte_at_a_time_matches_bulk() {
        let mut wire = encoded(b"first");
        wire.extend_from_slice(&encoded(&[START1, START2, 0x00]));
        wire.extend_from_slice(&encoded(b""));

        let bulk = FrameDecoder::new().feed_slice(&wire);

        let mut decoder = FrameDecoder::new();
        let single: Vec<Frame> = wire.iter().filter_map(|&b| decoder.feed(b)).collect();

        assert_eq!(bulk.len(), 3);
        assert_eq!(bulk, single);
    }

    #[test]
    fn garbage_before_frame_is_skipped() {
        let mut wire = BytesMut::from(&[0x00, 0xC3, 0x12, 0x94, 0x01, 0xFF][..]);
        wire.extend_from_slice(&encoded(b"payload"));

        let frames = FrameDecoder::new().feed_slice(&wire);
        assert_eq!(frames, vec![Frame::new(&b"payload"[..])]);
    }

    #[test]
    fn oversized_header_is_dropped_and_decoding_resumes() {
        let mut wire = BytesMut::from(&[START1, START2, 0x02, 0x01][..]);
        wire.extend_from_slice(&encoded(b"ok"));

        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed_slice(&wire);
        assert_eq!(frames, vec![Frame::new(&b"ok"[..])]);
        assert_eq!(decoder.stats().discarded, 1);
        assert_eq!(decoder.stats().frames, 1);
    }

    #[test]
    fn header_at_mtu_is_accepted() {
        let mut decoder = FrameDecoder::new();
        decoder.feed_slice(&[START1, START2, 0x02, 0x00]);
        assert_eq!(decoder.state(), DecoderState::Buffering);
        assert_eq!(decoder.stats().discarded, 0);
    }

    #[test]
    fn custom_mtu_is_enforced() {
        let mut decoder = FrameDecoder::with_mtu(4);
        assert!(decoder.feed_slice(&encoded(b"12345")).is_empty());
        assert_eq!(decoder.stats().discarded, 1);
        assert_eq!(decoder.feed_slice(&encoded(b"1234")).len(), 1);
    }

    #[test]
    fn mtu_cannot_be_raised() {
        let mut decoder = FrameDecoder::with_mtu(4096);
        assert!(decoder.feed_slice(&encoded(&[7u8; 600])).is_empty());
        assert_eq!(decoder.stats().discarded, 1);
    }

    #[test]
    fn any_run_of_start1_is_absorbed() {
        for run in 1..=9 {
            let mut wire = vec![START1; run];
            wire.extend_from_slice(&[START2, 0x00, 0x02, 0x10, 0x20]);
            let frames = FrameDecoder::new().feed_slice(&wire);
            assert_eq!(frames, vec![Frame::new(vec![0x10, 0x20])], "run of {run}");
        }
    }

    #[test]
    fn preamble_then_frame_scenario() {
        let wire = [
            0x94, 0x94, 0x94, 0x94, 0x94, 0xC3, 0x00, 0x04, 0x01, 0x02, 0x03, 0x04,
        ];
        let frames = FrameDecoder::new().feed_slice(&wire);
        assert_eq!(frames, vec![Frame::new(vec![0x01, 0x02, 0x03, 0x04])]);
    }

    #[test]
    fn garbled_stream_scenario() {
        let wire = [
            0xC3, 0x94, 0x94, 0x99, 0x94, 0x94, 0xC3, 0xC3, 0x02, 0x00, 0x94, 0x94, 0xC3, 0x00,
            0x04, 0x01, 0x02, 0x03, 0x04, 0x99,
        ];
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed_slice(&wire);
        assert_eq!(frames, vec![Frame::new(vec![0x01, 0x02, 0x03, 0x04])]);
        assert_eq!(decoder.state(), DecoderState::Idle);
    }

    #[test]
    fn broken_start_sequence_resets() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(START1).is_none());
        assert!(decoder.feed(0x00).is_none());
        assert_eq!(decoder.state(), DecoderState::Idle);
    }

    #[test]
    fn cursor_never_exceeds_target() {
        let mut decoder = FrameDecoder::new();
        decoder.feed_slice(&[START1, START2, 0x00, 0x03, 0xAA, 0xBB]);
        assert_eq!(decoder.buffered(), 2);
        let frame = decoder.feed(0xCC).unwrap();
        assert_eq!(frame.len(), 3);
        assert_eq!(decoder.buffered(), 0);
        assert_eq!(decoder.state(), DecoderState::Idle);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut decoder = FrameDecoder::new();
        decoder.feed_slice(&[START1, START2, 0x00, 0x03, 0xAA]);
        decoder.reset();
        assert_eq!(decoder.state(), DecoderState::Idle);
        assert!(decoder.feed_slice(&[0xBB, 0xCC]).is_empty());
    }

    #[test]
    fn frame_wire_size() {
        let frame = Frame::new(Bytes::from_static(b"test"));
        assert_eq!(frame.wire_size(), 4 + HEADER_SIZE + 4);
        assert_eq!(encoded(frame.payload()).len(), frame.wire_size());
    }
}
