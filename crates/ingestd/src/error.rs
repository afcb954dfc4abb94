//! Initialization Errors

use ingest_controller::ControllerError;
use sensor_record::ParseError;
use serial_link::LinkError;
use storage::StoreError;
use thiserror::Error;

/// Failures that stop the daemon before the main loop starts
#[derive(Debug, Error)]
pub enum InitError {
    #[error("Sensor data init failed: {0}")]
    SensorData(#[source] ParseError),

    #[error("Communication init failed: {0}")]
    Comm(#[source] LinkError),

    #[error("Cannot open input {path}: {source}")]
    Input {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Database init failed: {0}")]
    DbInit(#[source] StoreError),

    #[error("Database connect failed: {0}")]
    DbConnect(#[source] StoreError),

    #[error("Table creation failed: {0}")]
    TableCreate(#[source] StoreError),

    #[error("Settings could not be loaded: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Controller init failed: {0}")]
    Controller(#[from] ControllerError),
}

impl InitError {
    /// Process exit code, one per init step
    pub fn exit_code(&self) -> u8 {
        match self {
            InitError::SensorData(_) => 1,
            InitError::Comm(_) | InitError::Input { .. } => 2,
            InitError::DbInit(_) => 3,
            InitError::DbConnect(_) => 4,
            InitError::TableCreate(_) => 5,
            InitError::Settings(_) | InitError::InvalidSettings(_) | InitError::Controller(_) => 6,
        }
    }
}
