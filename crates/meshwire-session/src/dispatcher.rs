use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use meshwire_frame::{Frame, FrameError, FrameReceiver};
use tracing::{debug, info, warn};

use crate::envelope::{Envelope, MessageCodec};
use crate::state::SessionState;
use crate::topic::{Event, TopicRegistry};

/// What the dispatcher did with one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Identity or device config cache updated.
    Cached,
    /// Event published to this many subscribers.
    Published(usize),
    /// Handshake completion; `true` if the nonce matched.
    Handshake(bool),
    /// Unknown envelope, logged and dropped.
    Ignored,
    /// Payload failed to decode, logged and dropped.
    Malformed,
}

/// Routes decoded frames to the state cache and topic subscribers.
pub struct Dispatcher {
    codec: Arc<dyn MessageCodec>,
    state: Arc<SessionState>,
    topics: Arc<TopicRegistry>,
}

impl Dispatcher {
    pub fn new(
        codec: Arc<dyn MessageCodec>,
        state: Arc<SessionState>,
        topics: Arc<TopicRegistry>,
    ) -> Self {
        Self {
            codec,
            state,
            topics,
        }
    }

    /// Handle one frame. Never fails: bad input is logged and dropped.
    pub fn dispatch(&self, frame: &Frame) -> DispatchOutcome {
        let envelope = match self.codec.decode_envelope(frame.payload()) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(payload_len = frame.len(), "dropping undecodable frame: {err}");
                return DispatchOutcome::Malformed;
            }
        };
        debug!(kind = envelope.kind(), payload_len = frame.len(), "dispatching");

        match envelope {
            Envelope::Identity(identity) => {
                info!(node = identity.my_node_num, "radio identity received");
                self.state.set_identity(identity);
                DispatchOutcome::Cached
            }
            Envelope::DeviceConfig(config) => {
                debug!("radio config received");
                self.state.set_device_config(config);
                DispatchOutcome::Cached
            }
            Envelope::NodeEvent(node) => {
                DispatchOutcome::Published(self.topics.publish(&Event::Node(node)))
            }
            Envelope::Packet(packet) => {
                DispatchOutcome::Published(self.topics.publish(&Event::Packet(packet)))
            }
            Envelope::HandshakeComplete(config_id) => {
                DispatchOutcome::Handshake(self.state.complete_handshake(config_id))
            }
            Envelope::Unknown(kind) => {
                debug!(kind, "ignoring unhandled message");
                DispatchOutcome::Ignored
            }
        }
    }

    /// Drain `queue` until `stop` is set or every producer is gone.
    ///
    /// `poll` bounds how long a stop request can go unnoticed.
    pub fn run(&self, queue: &FrameReceiver, stop: &AtomicBool, poll: Duration) {
        debug!("dispatcher started");
        while !stop.load(Ordering::Acquire) {
            match queue.pop_timeout(poll) {
                Ok(Some(frame)) => {
                    self.dispatch(&frame);
                }
                Ok(None) => {}
                Err(FrameError::QueueClosed) => {
                    debug!("frame queue closed");
                    break;
                }
                Err(err) => {
                    warn!("frame queue error: {err}");
                    break;
                }
            }
        }
        debug!("dispatcher stopped");
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("topics", &self.topics)
            .finish_non_exhaustive()
    }
}
