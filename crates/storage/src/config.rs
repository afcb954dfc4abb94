//! Store Connection Settings

use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection parameters, opaque to the ingest core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    /// Per-statement timeout in seconds
    pub timeout_seconds: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            username: "sensor_user".to_string(),
            password: "sensor_pass".to_string(),
            database: "sensor_data".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl StoreConfig {
    /// Reject settings no connection could be opened with
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.host.is_empty() {
            return Err(StoreError::InvalidParam("host is empty".into()));
        }
        if self.port == 0 {
            return Err(StoreError::InvalidParam("port must be non-zero".into()));
        }
        if self.username.is_empty() {
            return Err(StoreError::InvalidParam("username is empty".into()));
        }
        if self.database.is_empty() {
            return Err(StoreError::InvalidParam("database is empty".into()));
        }
        Ok(())
    }
}

/// Connection string without the password
impl fmt::Display for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }
}
