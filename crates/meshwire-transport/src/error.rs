/// Errors that can occur on the physical link to the radio.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The link could not be opened (device absent, busy, or no permission).
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    /// The operation needs an open link.
    #[error("transport is not open")]
    NotOpen,

    /// An I/O error occurred on the byte stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote end went away.
    #[error("transport disconnected")]
    Disconnected,

    /// Port enumeration failed.
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
