use std::sync::{Condvar, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::message::{MyNodeInfo, RadioConfig};

/// Progress of the config handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStatus {
    /// No handshake requested yet.
    Idle,
    /// `WantConfigId(nonce)` sent, waiting for the echo.
    Pending { nonce: u32 },
    /// The radio echoed the nonce.
    Complete { config_id: u32 },
    /// The session stopped before the handshake finished.
    Abandoned,
}

/// How [`SessionState::wait_for_handshake`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeWait {
    Complete(u32),
    TimedOut,
    Abandoned,
}

/// Cached radio state, written by the dispatcher and read by callers.
///
/// Cached values are overwritten wholesale, never merged.
#[derive(Debug)]
pub struct SessionState {
    identity: RwLock<Option<MyNodeInfo>>,
    device_config: RwLock<Option<RadioConfig>>,
    handshake: Mutex<HandshakeStatus>,
    handshake_changed: Condvar,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            identity: RwLock::new(None),
            device_config: RwLock::new(None),
            handshake: Mutex::new(HandshakeStatus::Idle),
            handshake_changed: Condvar::new(),
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last identity the radio reported.
    pub fn identity(&self) -> Option<MyNodeInfo> {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_identity(&self, identity: MyNodeInfo) {
        *self
            .identity
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(identity);
    }

    /// Last radio configuration the radio reported.
    pub fn device_config(&self) -> Option<RadioConfig> {
        self.device_config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_device_config(&self, config: RadioConfig) {
        *self
            .device_config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(config);
    }

    pub fn handshake(&self) -> HandshakeStatus {
        *self.handshake.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start waiting for `nonce`. Replaces any earlier handshake.
    pub fn begin_handshake(&self, nonce: u32) {
        let mut status = self.handshake.lock().unwrap_or_else(PoisonError::into_inner);
        *status = HandshakeStatus::Pending { nonce };
        self.handshake_changed.notify_all();
    }

    /// Record a `HandshakeComplete(config_id)` from the radio.
    ///
    /// Returns `true` if it matched the pending nonce and waiters were woken.
    pub fn complete_handshake(&self, config_id: u32) -> bool {
        let mut status = self.handshake.lock().unwrap_or_else(PoisonError::into_inner);
        match *status {
            HandshakeStatus::Pending { nonce } if nonce == config_id => {
                *status = HandshakeStatus::Complete { config_id };
                self.handshake_changed.notify_all();
                info!(config_id, "config handshake complete");
                true
            }
            HandshakeStatus::Pending { nonce } => {
                warn!(config_id, expected = nonce, "ignoring handshake completion for stale nonce");
                false
            }
            other => {
                warn!(config_id, status = ?other, "ignoring unexpected handshake completion");
                false
            }
        }
    }

    /// Wake waiters because the session stopped. A completed handshake is kept.
    pub fn abandon_handshake(&self) {
        let mut status = self.handshake.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*status, HandshakeStatus::Pending { .. }) {
            *status = HandshakeStatus::Abandoned;
        }
        self.handshake_changed.notify_all();
    }

    /// Block until the pending handshake completes, is abandoned, or `timeout`
    /// elapses.
    pub fn wait_for_handshake(&self, timeout: Duration) -> HandshakeWait {
        let deadline = Instant::now() + timeout;
        let mut status = self.handshake.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match *status {
                HandshakeStatus::Complete { config_id } => return HandshakeWait::Complete(config_id),
                HandshakeStatus::Abandoned => return HandshakeWait::Abandoned,
                HandshakeStatus::Idle | HandshakeStatus::Pending { .. } => {}
            }

            let now = Instant::now();
            if now >= deadline {
                return HandshakeWait::TimedOut;
            }
            status = self
                .handshake_changed
                .wait_timeout(status, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}
