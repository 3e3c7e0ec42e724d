//! Session layer for mesh radio devices.
//!
//! A [`Session`] owns a [`Transport`](meshwire_transport::Transport), runs the
//! reader and dispatcher threads, caches what the radio reports about itself
//! and fans node events and packets out to topic subscribers.

pub mod config;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod message;
pub mod session;
pub mod state;
pub mod topic;

pub use config::SessionConfig;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use envelope::{CodecError, Envelope, MessageCodec, ProtobufCodec, Request};
pub use error::{Result, SessionError};
pub use session::{Session, SessionStatus};
pub use state::{HandshakeStatus, HandshakeWait, SessionState};
pub use topic::{Event, Subscriber, Topic, TopicRegistry};
