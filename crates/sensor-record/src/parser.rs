//! Frame Classification and Parsing

use crate::error::ParseError;
use crate::record::{
    InterruptType, Reading, Record, SensorKind, SensorStatus, MAX_SENSOR_NAME_LEN,
    MAX_STUDENT_ID_LEN,
};
use crate::tick::{MonotonicTicks, TickSource};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Parser scratch buffer size; inputs must be strictly shorter
pub const PARSE_BUFFER_SIZE: usize = 128;

const FIELD_COUNT: usize = 3;

/// Acceptance and warning ranges for temperature/humidity records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserLimits {
    /// Accepted temperature range (°C)
    pub temperature_range: (f32, f32),
    /// Temperatures outside this range are WARNING
    pub temperature_normal: (f32, f32),
    /// Accepted humidity range (%RH)
    pub humidity_range: (f32, f32),
    /// Humidities outside this range are WARNING
    pub humidity_normal: (f32, f32),
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            temperature_range: (-40.0, 85.0),
            temperature_normal: (-20.0, 60.0),
            humidity_range: (0.0, 100.0),
            humidity_normal: (10.0, 90.0),
        }
    }
}

fn within(value: f32, range: (f32, f32)) -> bool {
    value >= range.0 && value <= range.1
}

impl ParserLimits {
    /// Check that every range is ordered and each warning range sits inside
    /// its acceptance range
    pub fn validate(&self) -> Result<(), ParseError> {
        let pairs = [
            ("temperature", self.temperature_range, self.temperature_normal),
            ("humidity", self.humidity_range, self.humidity_normal),
        ];
        for (name, accept, normal) in pairs {
            if !(accept.0 <= accept.1) {
                return Err(ParseError::InvalidLimits(format!(
                    "{} range [{}, {}] is empty",
                    name, accept.0, accept.1
                )));
            }
            if !(normal.0 <= normal.1) {
                return Err(ParseError::InvalidLimits(format!(
                    "{} normal range [{}, {}] is empty",
                    name, normal.0, normal.1
                )));
            }
            if normal.0 < accept.0 || normal.1 > accept.1 {
                return Err(ParseError::InvalidLimits(format!(
                    "{} normal range [{}, {}] exceeds accepted range [{}, {}]",
                    name, normal.0, normal.1, accept.0, accept.1
                )));
            }
        }
        Ok(())
    }

    fn classify(&self, temperature: f32, humidity: f32) -> SensorStatus {
        if within(temperature, self.temperature_normal) && within(humidity, self.humidity_normal) {
            SensorStatus::Normal
        } else {
            SensorStatus::Warning
        }
    }
}

/// Whether `token` is a plain decimal: optional leading `-`, at most one
/// `.`, digits otherwise, and at least one digit.
pub fn is_decimal(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    let mut seen_digit = false;
    let mut seen_dot = false;
    for byte in digits.bytes() {
        match byte {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit
}

fn trim_field(token: &str) -> &str {
    token.trim_matches(|c: char| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

fn parse_decimal(token: &str) -> Result<f32, ParseError> {
    if !is_decimal(token) {
        return Err(ParseError::InvalidFormat);
    }
    token.parse::<f32>().map_err(|_| ParseError::InvalidFormat)
}

fn parse_interrupt_type(token: &str) -> Result<InterruptType, ParseError> {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidFormat);
    }
    if negative {
        return Err(ParseError::InvalidRange);
    }
    let value = digits.parse::<u32>().map_err(|_| ParseError::InvalidRange)?;
    InterruptType::try_from(value)
}

fn check_student_id(id: &str) -> Result<(), ParseError> {
    if id.is_empty() || id.len() > MAX_STUDENT_ID_LEN {
        return Err(ParseError::InvalidId);
    }
    Ok(())
}

/// Parser for both sensor families.
///
/// Stateless apart from its tick source: the same frame and a fixed tick
/// always produce the same result.
pub struct RecordParser<T: TickSource = MonotonicTicks> {
    limits: ParserLimits,
    ticks: T,
}

impl RecordParser<MonotonicTicks> {
    /// Parser with default limits and a fresh monotonic tick
    pub fn new() -> Self {
        Self {
            limits: ParserLimits::default(),
            ticks: MonotonicTicks::new(),
        }
    }
}

impl Default for RecordParser<MonotonicTicks> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TickSource> RecordParser<T> {
    /// Parser with explicit limits and tick source
    pub fn with_limits(limits: ParserLimits, ticks: T) -> Result<Self, ParseError> {
        limits.validate()?;
        Ok(Self { limits, ticks })
    }

    pub fn limits(&self) -> &ParserLimits {
        &self.limits
    }

    /// Decide the sensor family from the second field
    pub fn classify(second_field: &str) -> SensorKind {
        if is_decimal(second_field) {
            SensorKind::TempHumidity
        } else {
            SensorKind::Event
        }
    }

    /// Parse raw frame bytes
    pub fn parse_bytes(&self, input: &[u8]) -> Result<Record, ParseError> {
        if input.len() >= PARSE_BUFFER_SIZE {
            return Err(ParseError::BufferTooSmall);
        }
        let printable = |b: &u8| (0x20..=0x7E).contains(b) || matches!(*b, b'\t' | b'\r' | b'\n');
        if !input.iter().all(printable) {
            return Err(ParseError::InvalidFormat);
        }
        let text = std::str::from_utf8(input).map_err(|_| ParseError::InvalidFormat)?;
        self.parse_fields(text)
    }

    /// Parse one frame
    pub fn parse(&self, frame: &str) -> Result<Record, ParseError> {
        self.parse_bytes(frame.as_bytes())
    }

    fn parse_fields(&self, text: &str) -> Result<Record, ParseError> {
        let mut fields = [""; FIELD_COUNT];
        let mut count = 0;
        for token in text.split(',') {
            if count == FIELD_COUNT {
                return Err(ParseError::InvalidFormat);
            }
            let token = trim_field(token);
            if token.is_empty() {
                return Err(ParseError::InvalidFormat);
            }
            fields[count] = token;
            count += 1;
        }
        if count != FIELD_COUNT {
            return Err(ParseError::InvalidFormat);
        }

        let [id, second, third] = fields;
        let record = match Self::classify(second) {
            SensorKind::TempHumidity => self.parse_climate(id, second, third)?,
            SensorKind::Event => self.parse_event(id, second, third)?,
        };
        trace!("Parsed {}", record);
        Ok(record)
    }

    fn parse_climate(&self, id: &str, temp: &str, humid: &str) -> Result<Record, ParseError> {
        check_student_id(id)?;
        let temperature = parse_decimal(temp)?;
        let humidity = parse_decimal(humid)?;

        if !within(temperature, self.limits.temperature_range)
            || !within(humidity, self.limits.humidity_range)
        {
            return Err(ParseError::InvalidRange);
        }

        Ok(Record {
            student_id: id.to_string(),
            status: self.limits.classify(temperature, humidity),
            timestamp: self.ticks.now(),
            reading: Reading::TempHumidity {
                temperature,
                humidity,
            },
        })
    }

    fn parse_event(&self, id: &str, name: &str, int_type: &str) -> Result<Record, ParseError> {
        check_student_id(id)?;
        if name.len() > MAX_SENSOR_NAME_LEN {
            return Err(ParseError::InvalidName);
        }
        let interrupt_type = parse_interrupt_type(int_type)?;
        let triggered = interrupt_type != InterruptType::None;

        Ok(Record {
            student_id: id.to_string(),
            status: if triggered {
                SensorStatus::Warning
            } else {
                SensorStatus::Normal
            },
            timestamp: self.ticks.now(),
            reading: Reading::Event {
                sensor_name: name.to_string(),
                interrupt_type,
                interrupt_count: u32::from(triggered),
            },
        })
    }
}
