//! Storage Layer
//!
//! The store adapter contract used by the ingest controller, plus an
//! in-memory implementation of the two sensor tables.

mod adapter;
mod config;
mod memory;
pub mod sql;

pub use adapter::{RowCounts, StoreAdapter};
pub use config::StoreConfig;
pub use ingest_state::StoreStatus;
pub use memory::{MemoryStore, Sensor1Row, Sensor2Row};

use ingest_state::ErrorKind;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    ConnectionLost(String),
    #[error("Query error: {0}")]
    QueryFailed(String),
    #[error("Timeout error: no answer within {0}s")]
    Timeout(u32),
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),
}

impl StoreError {
    /// Map to the ingest error taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::ConnectionLost(_) => ErrorKind::ConnectionLost,
            StoreError::QueryFailed(_) => ErrorKind::QueryFailed,
            StoreError::Timeout(_) => ErrorKind::Timeout,
            StoreError::InvalidParam(_) => ErrorKind::InvalidParam,
        }
    }

    /// Whether the same insert may succeed if attempted again
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StoreError::InvalidParam(_))
    }
}
