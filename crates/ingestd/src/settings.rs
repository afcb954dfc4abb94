//! Daemon Settings
//!
//! Loaded from an optional file, then overridden by `INGEST_*` environment
//! variables (`__` separates nested keys, e.g. `INGEST_STORE__HOST`).

use config::{Config, ConfigError, Environment, File};
use ingest_controller::ControllerConfig;
use sensor_record::ParserLimits;
use serde::{Deserialize, Serialize};
use serial_link::UartConfig;
use std::time::Duration;
use storage::StoreConfig;

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `[LEVEL] message`
    Text,
    /// One JSON object per event
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Text
    }
}

/// Host UART simulator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Bytes delivered per simulated interrupt burst
    pub burst_size: usize,
    /// How long to wait for the mainline to empty the receive ring at end
    /// of input
    pub drain_timeout_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            burst_size: 16,
            drain_timeout_ms: 2000,
        }
    }
}

impl SimulatorConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

/// Everything the daemon can be configured with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Maximum log level (`error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: String,
    pub log_format: LogFormat,
    pub uart: UartConfig,
    pub store: StoreConfig,
    pub controller: ControllerConfig,
    pub parser: ParserLimits,
    pub simulator: SimulatorConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            uart: UartConfig::default(),
            store: StoreConfig::default(),
            controller: ControllerConfig::default(),
            parser: ParserLimits::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (if given) and the environment
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        Self::load_with(path, environment())
    }

    fn load_with(path: Option<&str>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        builder.add_source(env).build()?.try_deserialize()
    }
}

/// `INGEST_*` variables, `__` between nested keys
fn environment() -> Environment {
    Environment::with_prefix("INGEST")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
