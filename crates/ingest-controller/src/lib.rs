//! Ingest Controller
//!
//! The cooperative main loop: pulls frames from the serial link, parses
//! them, hands accepted records to the store, and keeps the statistics
//! balanced while doing so.

mod config;
mod controller;
mod hooks;

pub use config::{ControllerConfig, ControllerError};
pub use controller::IngestController;
pub use hooks::IngestHooks;
