//! Store Adapter Contract

use crate::{StoreConfig, StoreError};
use ingest_state::StoreStatus;
use sensor_record::Record;
use std::fmt;

/// Rows held per table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowCounts {
    pub sensor1: usize,
    pub sensor2: usize,
}

impl fmt::Display for RowCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sensor1={} sensor2={}", self.sensor1, self.sensor2)
    }
}

/// Destination for accepted records.
///
/// `insert` may be called again with the same record after a retryable
/// failure; storing the duplicate is acceptable, failing fatally is not.
/// Calls must return within the configured timeout.
pub trait StoreAdapter {
    /// Open a connection
    fn connect(&mut self, config: &StoreConfig) -> Result<(), StoreError>;

    /// Close the connection. Closing a closed store is not an error.
    fn disconnect(&mut self) -> Result<(), StoreError>;

    /// Persist one record
    fn insert(&mut self, record: &Record) -> Result<(), StoreError>;

    /// Current connection status
    fn status(&self) -> StoreStatus;

    /// Description of the most recent failure, empty if none
    fn last_error(&self) -> String;

    /// Create the sensor tables if they do not exist
    fn create_tables(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Rows per table, if the store can count them
    fn row_counts(&self) -> Option<RowCounts> {
        None
    }
}

impl<S: StoreAdapter + ?Sized> StoreAdapter for Box<S> {
    fn connect(&mut self, config: &StoreConfig) -> Result<(), StoreError> {
        (**self).connect(config)
    }

    fn disconnect(&mut self) -> Result<(), StoreError> {
        (**self).disconnect()
    }

    fn insert(&mut self, record: &Record) -> Result<(), StoreError> {
        (**self).insert(record)
    }

    fn status(&self) -> StoreStatus {
        (**self).status()
    }

    fn last_error(&self) -> String {
        (**self).last_error()
    }

    fn create_tables(&mut self) -> Result<(), StoreError> {
        (**self).create_tables()
    }

    fn row_counts(&self) -> Option<RowCounts> {
        (**self).row_counts()
    }
}
