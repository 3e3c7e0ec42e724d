//! Serial client for mesh radio devices.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte-stream link to the radio (serial, in-memory loopback)
//! - [`frame`]: Wake preamble, start-sequence framing and the frame queue
//! - [`session`]: Connection lifecycle, config handshake and topic fan-out

/// Re-export transport types.
pub mod transport {
    pub use meshwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use meshwire_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use meshwire_session::*;
}

pub use meshwire_session::{Event, Request, Session, SessionConfig, SessionError, Topic};
