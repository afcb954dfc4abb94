//! Ingest State
//!
//! The single process-wide state block of the ingest pipeline: statistics
//! counters, the last-error register of each subsystem and the store
//! connection status. Every field is an atomic word so the UART interrupt
//! and the mainline can both update it without locks.

mod kind;
mod state;

pub use kind::{ErrorKind, StoreStatus, Subsystem};
pub use state::{Counter, IngestState, LastErrors, StatsSnapshot};
