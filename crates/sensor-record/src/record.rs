//! Sensor Record Types

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed sensor name of temperature/humidity records
pub const SENSOR1_NAME: &str = "TEMP_HUMIDITY";

/// Longest accepted student id in bytes
pub const MAX_STUDENT_ID_LEN: usize = 19;

/// Longest accepted event sensor name in bytes
pub const MAX_SENSOR_NAME_LEN: usize = 15;

/// Quality class derived at parse time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SensorStatus {
    Normal,
    Warning,
    Error,
    Offline,
}

impl SensorStatus {
    /// Uppercase label stored in the status column
    pub fn label(&self) -> &'static str {
        match self {
            SensorStatus::Normal => "NORMAL",
            SensorStatus::Warning => "WARNING",
            SensorStatus::Error => "ERROR",
            SensorStatus::Offline => "OFFLINE",
        }
    }
}

impl fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Edge that triggered an event sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum InterruptType {
    None = 0,
    Rising = 1,
    Falling = 2,
    Both = 3,
}

impl InterruptType {
    /// Wire and column encoding
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Uppercase label
    pub fn label(&self) -> &'static str {
        match self {
            InterruptType::None => "NONE",
            InterruptType::Rising => "RISING",
            InterruptType::Falling => "FALLING",
            InterruptType::Both => "BOTH",
        }
    }
}

impl TryFrom<u32> for InterruptType {
    type Error = ParseError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(InterruptType::None),
            1 => Ok(InterruptType::Rising),
            2 => Ok(InterruptType::Falling),
            3 => Ok(InterruptType::Both),
            _ => Err(ParseError::InvalidRange),
        }
    }
}

impl fmt::Display for InterruptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sensor family of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    /// Temperature/humidity sensor
    TempHumidity,
    /// Edge-triggered event sensor
    Event,
}

/// Family-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reading {
    /// Sensor-1 measurement (°C, %RH)
    TempHumidity { temperature: f32, humidity: f32 },
    /// Sensor-2 event
    Event {
        sensor_name: String,
        interrupt_type: InterruptType,
        interrupt_count: u32,
    },
}

/// One parsed, validated frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub student_id: String,
    pub status: SensorStatus,
    /// Monotonic tick at parse time, never 0
    pub timestamp: u32,
    pub reading: Reading,
}

impl Record {
    /// Sensor family
    pub fn kind(&self) -> SensorKind {
        match self.reading {
            Reading::TempHumidity { .. } => SensorKind::TempHumidity,
            Reading::Event { .. } => SensorKind::Event,
        }
    }

    /// Sensor name column value
    pub fn sensor_name(&self) -> &str {
        match &self.reading {
            Reading::TempHumidity { .. } => SENSOR1_NAME,
            Reading::Event { sensor_name, .. } => sensor_name,
        }
    }

    /// Canonical wire line, without terminator
    pub fn to_line(&self) -> String {
        match &self.reading {
            Reading::TempHumidity {
                temperature,
                humidity,
            } => format!("{},{},{}", self.student_id, temperature, humidity),
            Reading::Event {
                sensor_name,
                interrupt_type,
                ..
            } => format!("{},{},{}", self.student_id, sensor_name, interrupt_type.code()),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reading {
            Reading::TempHumidity {
                temperature,
                humidity,
            } => write!(
                f,
                "ID:{},Sensor:{},Temp:{:.2},Humid:{:.2},Status:{},Time:{}",
                self.student_id, SENSOR1_NAME, temperature, humidity, self.status, self.timestamp
            ),
            Reading::Event {
                sensor_name,
                interrupt_type,
                interrupt_count,
            } => write!(
                f,
                "ID:{},Sensor:{},IntType:{},Count:{},Status:{},Time:{}",
                self.student_id,
                sensor_name,
                interrupt_type,
                interrupt_count,
                self.status,
                self.timestamp
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn climate() -> Record {
        Record {
            student_id: "2021001ZS".into(),
            status: SensorStatus::Normal,
            timestamp: 7,
            reading: Reading::TempHumidity {
                temperature: 25.6,
                humidity: 60.2,
            },
        }
    }

    fn door() -> Record {
        Record {
            student_id: "2021001ZS".into(),
            status: SensorStatus::Warning,
            timestamp: 7,
            reading: Reading::Event {
                sensor_name: "DOOR_SENSOR".into(),
                interrupt_type: InterruptType::Rising,
                interrupt_count: 1,
            },
        }
    }

    #[test]
    fn test_summary_format() {
        assert_eq!(
            climate().to_string(),
            "ID:2021001ZS,Sensor:TEMP_HUMIDITY,Temp:25.60,Humid:60.20,Status:NORMAL,Time:7"
        );
        assert_eq!(
            door().to_string(),
            "ID:2021001ZS,Sensor:DOOR_SENSOR,IntType:RISING,Count:1,Status:WARNING,Time:7"
        );
    }

    #[test]
    fn test_canonical_line() {
        assert_eq!(climate().to_line(), "2021001ZS,25.6,60.2");
        assert_eq!(door().to_line(), "2021001ZS,DOOR_SENSOR,1");
    }

    #[test]
    fn test_sensor_name_and_kind() {
        assert_eq!(climate().sensor_name(), SENSOR1_NAME);
        assert_eq!(climate().kind(), SensorKind::TempHumidity);
        assert_eq!(door().sensor_name(), "DOOR_SENSOR");
        assert_eq!(door().kind(), SensorKind::Event);
    }

    #[test]
    fn test_interrupt_type_decode() {
        assert_eq!(InterruptType::try_from(0), Ok(InterruptType::None));
        assert_eq!(InterruptType::try_from(3), Ok(InterruptType::Both));
        assert_eq!(InterruptType::try_from(4), Err(ParseError::InvalidRange));
        assert_eq!(InterruptType::Falling.to_string(), "FALLING");
    }
}
