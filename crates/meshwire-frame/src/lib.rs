//! Self-synchronizing serial framing for mesh radio devices.
//!
//! Every frame on the wire is:
//! - A 4-byte wake preamble (`0x94` repeated), written before each outbound frame
//! - A 2-byte start sequence (`0x94 0xC3`) for stream synchronization
//! - A 2-byte big-endian payload length (at most [`MTU`] bytes)
//! - The payload
//!
//! The decoder is a byte-at-a-time state machine that skips noise and drops
//! oversized headers, so a corrupted stream heals itself at the next header.

pub mod codec;
pub mod error;
pub mod queue;
pub mod reader;
pub mod writer;

pub use codec::{
    encode_frame, encode_header, DecoderState, DecoderStats, Frame, FrameConfig, FrameDecoder,
    DEFAULT_WAKE_DELAY, HEADER_SIZE, MTU, START1, START2, WAKE_PREAMBLE,
};
pub use error::{FrameError, Result};
pub use queue::{frame_queue, FrameReceiver, FrameSender, DEFAULT_QUEUE_CAPACITY};
pub use reader::FrameReader;
pub use writer::FrameWriter;
