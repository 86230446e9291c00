//! Session configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for an envelope session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Timeout applied to each custody/blob/directory call, in milliseconds.
    /// Expiry surfaces as `SessionError::Timeout`; the session never retries.
    pub op_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { op_timeout_ms: 10_000 }
    }
}

impl SessionConfig {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}
