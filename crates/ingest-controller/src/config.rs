//! Controller Configuration

use ingest_state::ErrorKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Controller errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("Invalid controller configuration: {0}")]
    InvalidConfig(String),
}

impl ControllerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ControllerError::InvalidConfig(_) => ErrorKind::InvalidParam,
        }
    }
}

/// Main loop settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Frames handled per iteration before yielding
    pub max_frames_per_tick: usize,
    /// Insert attempts per record, first one included
    pub max_retry_count: u32,
    /// Iterations between heartbeats
    pub heartbeat_interval: u64,
    /// Store calls slower than this count as timeouts
    pub communication_timeout_ms: u64,
    /// Also write heartbeats to the serial link
    pub echo_heartbeat: bool,
    /// Sleep after an iteration that found nothing to do
    pub idle_sleep_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_frames_per_tick: 8,
            max_retry_count: 3,
            heartbeat_interval: 10_000,
            communication_timeout_ms: 5000,
            echo_heartbeat: false,
            idle_sleep_ms: 1,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.max_frames_per_tick == 0 {
            return Err(ControllerError::InvalidConfig(
                "max_frames_per_tick must be at least 1".into(),
            ));
        }
        if self.max_retry_count == 0 {
            return Err(ControllerError::InvalidConfig(
                "max_retry_count must be at least 1".into(),
            ));
        }
        if self.heartbeat_interval == 0 {
            return Err(ControllerError::InvalidConfig(
                "heartbeat_interval must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn communication_timeout(&self) -> Duration {
        Duration::from_millis(self.communication_timeout_ms)
    }

    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }
}
