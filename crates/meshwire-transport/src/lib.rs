//! Byte-stream transport abstraction for mesh radio devices.
//!
//! This is the lowest layer of meshwire. A [`Transport`] is an ordered byte
//! stream that reports errors instead of dropping bytes; everything above it
//! (framing, dispatch, sessions) is medium-agnostic.
//!
//! - [`SerialTransport`]: USB/UART serial link (the production transport)
//! - [`MemoryTransport`]: in-process loopback for simulators and tests

pub mod error;
pub mod memory;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::{MemoryDevice, MemoryTransport};
pub use serial::{
    available_ports, PortEntry, SerialConfig, SerialTransport, DEFAULT_BAUD_RATE, DEFAULT_PORT,
    DEFAULT_READ_TIMEOUT,
};
pub use traits::Transport;
