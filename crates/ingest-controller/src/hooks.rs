//! Observer Hooks

use ingest_state::{ErrorKind, Subsystem};
use sensor_record::Record;
use serial_link::Frame;

/// Optional observers invoked by the main loop. Every method defaults to a
/// no-op, and a controller without hooks behaves the same as one with
/// empty hooks.
pub trait IngestHooks {
    /// A complete frame left the line assembler
    fn on_frame(&mut self, _frame: &Frame) {}

    /// A subsystem reported an error on the ingest path
    fn on_error(&mut self, _subsystem: Subsystem, _kind: ErrorKind) {}

    /// A record was stored
    fn on_record(&mut self, _record: &Record) {}
}
