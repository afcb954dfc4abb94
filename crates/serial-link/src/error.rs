//! Serial Link Error Types

use ingest_state::ErrorKind;
use thiserror::Error;

/// Errors raised by the serial link
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// No byte arrived within the polling window
    #[error("Communication timeout after {0}ms")]
    Timeout(u64),

    /// Line exceeded the accumulator before a delimiter arrived
    #[error("Frame too long: more than {limit} bytes before a delimiter")]
    FrameTooLong { limit: usize },

    /// Transmit ring cannot take the whole outbound message
    #[error("Buffer full: {needed} bytes needed, {free} free")]
    BufferFull { needed: usize, free: usize },

    /// Invalid configuration or argument
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    /// UART driver refused the request
    #[error("UART hardware error: {0}")]
    Hardware(String),
}

impl LinkError {
    /// Map to the ingest error taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            LinkError::Timeout(_) => ErrorKind::Timeout,
            LinkError::FrameTooLong { .. } => ErrorKind::FrameTooLong,
            LinkError::BufferFull { .. } => ErrorKind::BufferFull,
            LinkError::InvalidParam(_) => ErrorKind::InvalidParam,
            LinkError::Hardware(_) => ErrorKind::LineFault,
        }
    }
}
