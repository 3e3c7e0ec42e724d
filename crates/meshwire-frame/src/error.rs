use meshwire_transport::TransportError;

/// Errors that can occur while moving frames over a transport.
///
/// Corrupt or oversized headers in the inbound stream are not errors: the
/// decoder drops them and resynchronizes on the next start sequence.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The underlying link failed.
    #[error("frame transport error: {0}")]
    Transport(#[from] TransportError),

    /// The other end of the frame queue is gone.
    #[error("frame queue closed")]
    QueueClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
