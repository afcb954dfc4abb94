//! Serial Link
//!
//! The UART side of the ingest pipeline. The hardware driver delivers bytes
//! into [`SerialLink`] from interrupt context; the mainline pulls them back
//! out through a [`LineAssembler`], which turns the byte stream into
//! CR/LF-delimited [`Frame`]s.

mod assembler;
mod config;
mod error;
mod hardware;
mod link;

pub use assembler::{AssemblerState, Frame, LineAssembler, Step, LINE_BUFFER_SIZE, MAX_FRAME_LEN};
pub use config::{Parity, UartConfig};
pub use error::LinkError;
pub use hardware::{LineError, MockUart, UartHardware};
pub use link::SerialLink;

/// Special characters on the wire
pub mod chars {
    /// Carriage return
    pub const CR: u8 = 0x0D;
    /// Line feed
    pub const LF: u8 = 0x0A;
    /// Outbound line terminator
    pub const LINE_ENDING: &str = "\r\n";
}
