//! Error Taxonomy and Status Codes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error kinds recorded in the last-error registers.
///
/// `repr(u8)` so a register is a single atomic byte that interrupt context
/// can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ErrorKind {
    /// No error recorded
    None = 0,

    // Framing
    /// Receive ring was full, newest byte dropped
    RxOverflow = 1,
    /// Line exceeded the accumulator before a delimiter arrived
    FrameTooLong = 2,
    /// Nothing arrived (link) or the store did not answer in time
    Timeout = 3,
    /// UART reported a framing, parity or noise error
    LineFault = 4,
    /// Transmit ring could not take an outbound line
    BufferFull = 5,

    // Parse
    /// Wrong field count or malformed number
    InvalidFormat = 10,
    /// Student id empty or too long
    InvalidId = 11,
    /// Sensor name empty or too long
    InvalidName = 12,
    /// Value outside the acceptance range
    InvalidRange = 13,
    /// Input longer than the parser scratch buffer
    BufferTooSmall = 14,

    // Store
    /// Store connection dropped
    ConnectionLost = 20,
    /// Store rejected or failed the statement
    QueryFailed = 21,
    /// Record or configuration unacceptable to the store
    InvalidParam = 22,
}

impl ErrorKind {
    /// Uppercase label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::None => "NONE",
            ErrorKind::RxOverflow => "RX_OVERFLOW",
            ErrorKind::FrameTooLong => "FRAME_TOO_LONG",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::LineFault => "LINE_FAULT",
            ErrorKind::BufferFull => "BUFFER_FULL",
            ErrorKind::InvalidFormat => "INVALID_FORMAT",
            ErrorKind::InvalidId => "INVALID_ID",
            ErrorKind::InvalidName => "INVALID_NAME",
            ErrorKind::InvalidRange => "INVALID_RANGE",
            ErrorKind::BufferTooSmall => "BUFFER_TOO_SMALL",
            ErrorKind::ConnectionLost => "CONNECTION_LOST",
            ErrorKind::QueryFailed => "QUERY_FAILED",
            ErrorKind::InvalidParam => "INVALID_PARAM",
        }
    }

    /// Get the register encoding
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Decode a register value. Unknown codes decode to `None`.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => ErrorKind::RxOverflow,
            2 => ErrorKind::FrameTooLong,
            3 => ErrorKind::Timeout,
            4 => ErrorKind::LineFault,
            5 => ErrorKind::BufferFull,
            10 => ErrorKind::InvalidFormat,
            11 => ErrorKind::InvalidId,
            12 => ErrorKind::InvalidName,
            13 => ErrorKind::InvalidRange,
            14 => ErrorKind::BufferTooSmall,
            20 => ErrorKind::ConnectionLost,
            21 => ErrorKind::QueryFailed,
            22 => ErrorKind::InvalidParam,
            _ => ErrorKind::None,
        }
    }
}

impl Default for ErrorKind {
    fn default() -> Self {
        ErrorKind::None
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Subsystems that own a last-error register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subsystem {
    /// UART rings and line reassembly
    Link,
    /// Record parser
    Parser,
    /// Store adapter
    Store,
}

impl Subsystem {
    /// All subsystems, in register order
    pub const ALL: [Subsystem; 3] = [Subsystem::Link, Subsystem::Parser, Subsystem::Store];

    pub(crate) fn index(&self) -> usize {
        match self {
            Subsystem::Link => 0,
            Subsystem::Parser => 1,
            Subsystem::Store => 2,
        }
    }

    /// Lowercase name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Subsystem::Link => "link",
            Subsystem::Parser => "parser",
            Subsystem::Store => "store",
        }
    }
}

/// Connection status of the store adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum StoreStatus {
    Disconnected = 0,
    Connected = 1,
    Error = 2,
    Busy = 3,
}

impl StoreStatus {
    /// Decode a register value. Unknown codes decode to `Error`.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => StoreStatus::Disconnected,
            1 => StoreStatus::Connected,
            3 => StoreStatus::Busy,
            _ => StoreStatus::Error,
        }
    }

    /// Uppercase label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            StoreStatus::Disconnected => "DISCONNECTED",
            StoreStatus::Connected => "CONNECTED",
            StoreStatus::Error => "ERROR",
            StoreStatus::Busy => "BUSY",
        }
    }
}

impl Default for StoreStatus {
    fn default() -> Self {
        StoreStatus::Disconnected
    }
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
