use std::path::Path;
use std::time::Duration;

use meshwire_frame::{FrameConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_WAKE_DELAY, MTU};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// Tunables for a [`Session`](crate::Session).
///
/// Every field has a default, so a config file only needs the fields it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Decoded frames held between reader and dispatcher. Default: 10.
    pub queue_capacity: usize,
    /// Maximum frame payload. May be lowered, never raised above 512.
    pub mtu: usize,
    /// Pause after the wake preamble, in milliseconds. Default: 100.
    pub wake_delay_ms: u64,
    /// How long the dispatcher waits on an empty queue before re-checking
    /// the stop flag, in milliseconds. Default: 50.
    pub poll_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            mtu: MTU,
            wake_delay_ms: DEFAULT_WAKE_DELAY.as_millis() as u64,
            poll_interval_ms: 50,
        }
    }
}

impl SessionConfig {
    /// Parse a JSON config and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| SessionError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Reject settings the link cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(SessionError::Config(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.mtu == 0 || self.mtu > MTU {
            return Err(SessionError::Config(format!(
                "mtu must be between 1 and {MTU}"
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(SessionError::Config(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            mtu: self.mtu,
            wake_delay: Duration::from_millis(self.wake_delay_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
