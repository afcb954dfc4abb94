//! SQL Statement Rendering
//!
//! Text values are checked for characters that could break out of a quoted
//! literal and rejected rather than escaped into the statement.

use crate::StoreError;
use sensor_record::{Reading, Record};

/// Temperature/humidity table
pub const TABLE_SENSOR1: &str = "sensor1_data";

/// Event table
pub const TABLE_SENSOR2: &str = "sensor2_data";

pub const CREATE_SENSOR1_TABLE: &str = "CREATE TABLE IF NOT EXISTS sensor1_data (\
    id INT AUTO_INCREMENT PRIMARY KEY, \
    student_id VARCHAR(20) NOT NULL, \
    sensor_name VARCHAR(16) NOT NULL, \
    temperature DECIMAL(5,2) NOT NULL, \
    humidity DECIMAL(5,2) NOT NULL, \
    status VARCHAR(10) NOT NULL, \
    timestamp INT UNSIGNED NOT NULL, \
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP, \
    INDEX idx_student_id (student_id), \
    INDEX idx_timestamp (timestamp))";

pub const CREATE_SENSOR2_TABLE: &str = "CREATE TABLE IF NOT EXISTS sensor2_data (\
    id INT AUTO_INCREMENT PRIMARY KEY, \
    student_id VARCHAR(20) NOT NULL, \
    sensor_name VARCHAR(16) NOT NULL, \
    interrupt_type TINYINT NOT NULL, \
    interrupt_count INT UNSIGNED NOT NULL, \
    status VARCHAR(10) NOT NULL, \
    timestamp INT UNSIGNED NOT NULL, \
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP, \
    INDEX idx_student_id (student_id), \
    INDEX idx_sensor_name (sensor_name), \
    INDEX idx_timestamp (timestamp))";

const FORBIDDEN: [char; 4] = ['\'', '"', ';', '\\'];

/// Reject text that could terminate a literal or a statement
pub fn check_text(field: &str, value: &str) -> Result<(), StoreError> {
    match value.chars().find(|c| FORBIDDEN.contains(c)) {
        Some(c) => Err(StoreError::InvalidParam(format!(
            "{} contains forbidden character {:?}",
            field, c
        ))),
        None => Ok(()),
    }
}

/// Quote a checked value as a string literal
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `INSERT` statement for a record, targeting the table of its family
pub fn insert_statement(record: &Record) -> Result<String, StoreError> {
    check_text("student_id", &record.student_id)?;
    check_text("sensor_name", record.sensor_name())?;

    let sql = match &record.reading {
        Reading::TempHumidity {
            temperature,
            humidity,
        } => format!(
            "INSERT INTO {} (student_id, sensor_name, temperature, humidity, status, timestamp) \
             VALUES ({}, {}, {:.2}, {:.2}, {}, {})",
            TABLE_SENSOR1,
            quote(&record.student_id),
            quote(record.sensor_name()),
            temperature,
            humidity,
            quote(record.status.label()),
            record.timestamp
        ),
        Reading::Event {
            sensor_name,
            interrupt_type,
            interrupt_count,
        } => format!(
            "INSERT INTO {} (student_id, sensor_name, interrupt_type, interrupt_count, status, timestamp) \
             VALUES ({}, {}, {}, {}, {}, {})",
            TABLE_SENSOR2,
            quote(&record.student_id),
            quote(sensor_name),
            interrupt_type.code(),
            interrupt_count,
            quote(record.status.label()),
            record.timestamp
        ),
    };
    Ok(sql)
}

/// Newest rows of one student
pub fn select_latest(table: &str, student_id: &str, limit: usize) -> Result<String, StoreError> {
    check_text("student_id", student_id)?;
    Ok(format!(
        "SELECT * FROM {} WHERE student_id = {} ORDER BY timestamp DESC LIMIT {}",
        table,
        quote(student_id),
        limit
    ))
}

pub fn count_rows(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", table)
}

/// Delete rows created more than `days` days ago
pub fn purge_older_than(table: &str, days: u32) -> String {
    format!(
        "DELETE FROM {} WHERE created_at < DATE_SUB(NOW(), INTERVAL {} DAY)",
        table, days
    )
}
