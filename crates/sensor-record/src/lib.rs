//! Sensor Records and Frame Parsing
//!
//! Turns one text frame into a validated [`Record`]. Two sensor families
//! share the wire; [`RecordParser`] tells them apart by the shape of the
//! second field.

mod error;
mod parser;
mod record;
mod tick;

pub use error::ParseError;
pub use parser::{is_decimal, ParserLimits, RecordParser, PARSE_BUFFER_SIZE};
pub use record::{
    InterruptType, Reading, Record, SensorKind, SensorStatus, MAX_SENSOR_NAME_LEN,
    MAX_STUDENT_ID_LEN, SENSOR1_NAME,
};
pub use tick::{FixedTicks, MonotonicTicks, TickSource};
