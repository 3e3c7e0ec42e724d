//! Bounded hand-off between the reader thread and the dispatcher.
//!
//! A full queue blocks the producer. This is the only backpressure in the
//! pipeline: a device that floods frames stalls byte consumption instead of
//! growing memory.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::codec::Frame;
use crate::error::{FrameError, Result};

/// Default number of decoded frames held between reader and dispatcher.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Producing half of a frame queue.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: Sender<Frame>,
}

/// Consuming half of a frame queue.
#[derive(Debug)]
pub struct FrameReceiver {
    rx: Receiver<Frame>,
}

/// Create a bounded frame queue holding at most `capacity` frames (minimum 1).
pub fn frame_queue(capacity: usize) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    (FrameSender { tx }, FrameReceiver { rx })
}

impl FrameSender {
    /// Enqueue a frame, blocking while the queue is full.
    pub fn push(&self, frame: Frame) -> Result<()> {
        self.tx.send(frame).map_err(|_| FrameError::QueueClosed)
    }

    /// Frames currently queued.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

impl FrameReceiver {
    /// Wait up to `timeout` for the next frame.
    ///
    /// Returns `Ok(None)` on timeout and `Err(QueueClosed)` once every sender
    /// is gone and the queue is drained.
    pub fn pop_timeout(&self, timeout: Duration) -> Result<Option<Frame>> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(FrameError::QueueClosed),
        }
    }

    /// Maximum number of frames the queue holds.
    pub fn capacity(&self) -> usize {
        self.rx.capacity().unwrap_or(usize::MAX)
    }

    /// Frames currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
