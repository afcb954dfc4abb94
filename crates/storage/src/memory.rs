//! In-Memory Tabular Store

use crate::adapter::{RowCounts, StoreAdapter};
use crate::sql::{self, TABLE_SENSOR1, TABLE_SENSOR2};
use crate::{StoreConfig, StoreError};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use ingest_state::StoreStatus;
use sensor_record::{InterruptType, Reading, Record, SensorStatus};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Row of the temperature/humidity table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor1Row {
    pub id: u64,
    pub student_id: String,
    pub sensor_name: String,
    pub temperature: f32,
    pub humidity: f32,
    pub status: SensorStatus,
    pub timestamp: u32,
    pub created_at: DateTime<Utc>,
}

/// Row of the event table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor2Row {
    pub id: u64,
    pub student_id: String,
    pub sensor_name: String,
    pub interrupt_type: InterruptType,
    pub interrupt_count: u32,
    pub status: SensorStatus,
    pub timestamp: u32,
    pub created_at: DateTime<Utc>,
}

/// Store keeping both sensor tables in memory.
///
/// Failures can be scripted with [`fail_next`](Self::fail_next) and
/// [`refuse_connections`](Self::refuse_connections), and a fixed call
/// latency with [`set_latency`](Self::set_latency).
pub struct MemoryStore {
    config: Option<StoreConfig>,
    status: StoreStatus,
    last_error: String,
    tables_created: bool,
    sensor1: VecDeque<Sensor1Row>,
    sensor2: VecDeque<Sensor2Row>,
    /// Rows kept per table before the oldest are evicted
    max_rows: usize,
    next_id: u64,
    faults: VecDeque<StoreError>,
    refused_connects: u32,
    latency: Duration,
    inserts_attempted: u64,
    connects: u64,
}

impl MemoryStore {
    /// Create an empty, disconnected store
    pub fn new() -> Self {
        Self::with_retention(100_000)
    }

    /// Create a store that keeps at most `max_rows` rows per table
    pub fn with_retention(max_rows: usize) -> Self {
        info!("Creating in-memory store (retention {} rows per table)", max_rows);
        Self {
            config: None,
            status: StoreStatus::Disconnected,
            last_error: String::new(),
            tables_created: false,
            sensor1: VecDeque::new(),
            sensor2: VecDeque::new(),
            max_rows: max_rows.max(1),
            next_id: 1,
            faults: VecDeque::new(),
            refused_connects: 0,
            latency: Duration::ZERO,
            inserts_attempted: 0,
            connects: 0,
        }
    }

    /// Make the next insert fail with `error`. Calls queue up.
    pub fn fail_next(&mut self, error: StoreError) {
        self.faults.push_back(error);
    }

    /// Refuse the next `count` connection attempts
    pub fn refuse_connections(&mut self, count: u32) {
        self.refused_connects = count;
    }

    /// Delay every insert by `latency`
    pub fn set_latency(&mut self, latency: Duration) {
        self.latency = latency;
    }

    /// Insert calls seen, failed ones included
    pub fn inserts_attempted(&self) -> u64 {
        self.inserts_attempted
    }

    /// Successful connects
    pub fn connects(&self) -> u64 {
        self.connects
    }

    /// Settings of the current or last connection
    pub fn config(&self) -> Option<&StoreConfig> {
        self.config.as_ref()
    }

    fn fail(&mut self, error: StoreError) -> StoreError {
        self.last_error = error.to_string();
        error
    }

    fn require_connection(&mut self) -> Result<(), StoreError> {
        if self.status != StoreStatus::Connected {
            return Err(self.fail(StoreError::ConnectionLost("not connected".into())));
        }
        Ok(())
    }

    fn next_row_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Newest temperature/humidity rows of a student
    pub fn query_sensor1(
        &mut self,
        student_id: &str,
        limit: usize,
    ) -> Result<Vec<Sensor1Row>, StoreError> {
        self.require_connection()?;
        let statement = sql::select_latest(TABLE_SENSOR1, student_id, limit)
            .map_err(|e| self.fail(e))?;
        debug!("Query SQL: {}", statement);

        Ok(self
            .sensor1
            .iter()
            .rev()
            .filter(|row| row.student_id == student_id)
            .take(limit)
            .cloned()
            .collect())
    }

    /// Newest event rows of a student
    pub fn query_sensor2(
        &mut self,
        student_id: &str,
        limit: usize,
    ) -> Result<Vec<Sensor2Row>, StoreError> {
        self.require_connection()?;
        let statement = sql::select_latest(TABLE_SENSOR2, student_id, limit)
            .map_err(|e| self.fail(e))?;
        debug!("Query SQL: {}", statement);

        Ok(self
            .sensor2
            .iter()
            .rev()
            .filter(|row| row.student_id == student_id)
            .take(limit)
            .cloned()
            .collect())
    }

    /// Delete rows older than `age`, returning how many were removed
    pub fn purge_older_than(&mut self, age: Duration) -> Result<usize, StoreError> {
        self.require_connection()?;
        let age = ChronoDuration::from_std(age)
            .map_err(|e| self.fail(StoreError::InvalidParam(format!("retention age: {}", e))))?;
        let cutoff = Utc::now() - age;
        let days = age.num_days().max(0) as u32;
        debug!("SQL: {}", sql::purge_older_than(TABLE_SENSOR1, days));
        debug!("SQL: {}", sql::purge_older_than(TABLE_SENSOR2, days));

        let before = self.sensor1.len() + self.sensor2.len();
        self.sensor1.retain(|row| row.created_at > cutoff);
        self.sensor2.retain(|row| row.created_at > cutoff);
        let removed = before - (self.sensor1.len() + self.sensor2.len());
        if removed > 0 {
            info!("Purged {} rows older than {}s", removed, age.num_seconds());
        }
        Ok(removed)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreAdapter for MemoryStore {
    fn connect(&mut self, config: &StoreConfig) -> Result<(), StoreError> {
        config.validate().map_err(|e| self.fail(e))?;
        info!("Connecting to database: {}", config);
        self.config = Some(config.clone());

        if self.refused_connects > 0 {
            self.refused_connects -= 1;
            self.status = StoreStatus::Error;
            return Err(self.fail(StoreError::ConnectionLost("connection refused".into())));
        }

        self.status = StoreStatus::Connected;
        self.connects += 1;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), StoreError> {
        if self.status != StoreStatus::Disconnected {
            info!("Disconnecting from database");
            self.status = StoreStatus::Disconnected;
        }
        Ok(())
    }

    fn insert(&mut self, record: &Record) -> Result<(), StoreError> {
        self.inserts_attempted += 1;
        self.require_connection()?;

        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        if let Some(fault) = self.faults.pop_front() {
            if matches!(fault, StoreError::ConnectionLost(_)) {
                self.status = StoreStatus::Error;
            }
            warn!("Injected store failure: {}", fault);
            return Err(self.fail(fault));
        }

        if !self.tables_created {
            return Err(self.fail(StoreError::QueryFailed(format!(
                "table {} doesn't exist",
                match record.reading {
                    Reading::TempHumidity { .. } => TABLE_SENSOR1,
                    Reading::Event { .. } => TABLE_SENSOR2,
                }
            ))));
        }

        let statement = sql::insert_statement(record).map_err(|e| self.fail(e))?;
        debug!("SQL: {}", statement);

        let id = self.next_row_id();
        let created_at = Utc::now();
        match &record.reading {
            Reading::TempHumidity {
                temperature,
                humidity,
            } => {
                self.sensor1.push_back(Sensor1Row {
                    id,
                    student_id: record.student_id.clone(),
                    sensor_name: record.sensor_name().to_string(),
                    temperature: *temperature,
                    humidity: *humidity,
                    status: record.status,
                    timestamp: record.timestamp,
                    created_at,
                });
                while self.sensor1.len() > self.max_rows {
                    self.sensor1.pop_front();
                }
            }
            Reading::Event {
                sensor_name,
                interrupt_type,
                interrupt_count,
            } => {
                self.sensor2.push_back(Sensor2Row {
                    id,
                    student_id: record.student_id.clone(),
                    sensor_name: sensor_name.clone(),
                    interrupt_type: *interrupt_type,
                    interrupt_count: *interrupt_count,
                    status: record.status,
                    timestamp: record.timestamp,
                    created_at,
                });
                while self.sensor2.len() > self.max_rows {
                    self.sensor2.pop_front();
                }
            }
        }
        Ok(())
    }

    fn status(&self) -> StoreStatus {
        self.status
    }

    fn last_error(&self) -> String {
        self.last_error.clone()
    }

    fn create_tables(&mut self) -> Result<(), StoreError> {
        self.require_connection()?;
        debug!("SQL: {}", sql::CREATE_SENSOR1_TABLE);
        debug!("SQL: {}", sql::CREATE_SENSOR2_TABLE);
        self.tables_created = true;
        info!("Tables {} and {} ready", TABLE_SENSOR1, TABLE_SENSOR2);
        Ok(())
    }

    fn row_counts(&self) -> Option<RowCounts> {
        trace!("SQL: {}", sql::count_rows(TABLE_SENSOR1));
        trace!("SQL: {}", sql::count_rows(TABLE_SENSOR2));
        Some(RowCounts {
            sensor1: self.sensor1.len(),
            sensor2: self.sensor2.len(),
        })
    }
}
