//! Lock-Free Byte Ring
//!
//! Provides the fixed-capacity SPSC byte rings that sit between the UART
//! interrupt and the mainline loop. One ring per direction; the receive ring
//! is filled by the interrupt and drained by the mainline, the transmit ring
//! the other way round.

mod buffer;

pub use buffer::ByteRing;

/// Receive ring capacity in bytes (one slot stays reserved)
pub const RX_BUFFER_SIZE: usize = 256;

/// Transmit ring capacity in bytes (one slot stays reserved)
pub const TX_BUFFER_SIZE: usize = 512;

/// Ring filled by the receive interrupt
pub type RxRing = ByteRing<RX_BUFFER_SIZE>;

/// Ring drained by the transmit-empty interrupt
pub type TxRing = ByteRing<TX_BUFFER_SIZE>;
