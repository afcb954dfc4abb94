//! Parse Error Types

use ingest_state::ErrorKind;
use thiserror::Error;

/// Reasons a frame is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Wrong field count, empty field or malformed number
    #[error("Invalid data format")]
    InvalidFormat,

    /// Student id too long
    #[error("Invalid student ID")]
    InvalidId,

    /// Sensor name too long
    #[error("Invalid sensor name")]
    InvalidName,

    /// Value outside its acceptance range
    #[error("Data out of range")]
    InvalidRange,

    /// Input does not fit the parser scratch buffer
    #[error("Buffer too small")]
    BufferTooSmall,

    /// Parser limits are inconsistent
    #[error("Invalid parser limits: {0}")]
    InvalidLimits(String),
}

impl ParseError {
    /// Map to the ingest error taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::InvalidFormat => ErrorKind::InvalidFormat,
            ParseError::InvalidId => ErrorKind::InvalidId,
            ParseError::InvalidName => ErrorKind::InvalidName,
            ParseError::InvalidRange => ErrorKind::InvalidRange,
            ParseError::BufferTooSmall => ErrorKind::BufferTooSmall,
            ParseError::InvalidLimits(_) => ErrorKind::InvalidParam,
        }
    }
}
