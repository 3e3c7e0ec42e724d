use std::time::Duration;

use meshwire_frame::FrameError;
use meshwire_transport::TransportError;

use crate::envelope::CodecError;
use crate::session::SessionStatus;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error (open, read or write).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error other than a transport failure.
    #[error("frame error: {0}")]
    Frame(FrameError),

    /// A message could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A topic name did not match any known topic.
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    /// The operation needs a connected session.
    #[error("session is not connected (state: {0})")]
    NotConnected(SessionStatus),

    /// `connect` was called on a session that is already running.
    #[error("session is already connected")]
    AlreadyConnected,

    /// The session was closed and cannot be reused.
    #[error("session is closed")]
    Closed,

    /// The radio did not finish the config handshake in time.
    #[error("handshake did not complete within {0:?}")]
    HandshakeTimeout(Duration),

    /// A background worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Session configuration is invalid.
    #[error("invalid session config: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<FrameError> for SessionError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Transport(inner) => SessionError::Transport(inner),
            other => SessionError::Frame(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
