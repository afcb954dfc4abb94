//! Sensor Ingest Daemon
//!
//! Wires the ingest core together on a host: settings, logging, the init
//! sequence with one exit code per subsystem, and a UART simulator that
//! feeds a file or stdin through the interrupt entry points.

pub mod error;
pub mod logging;
pub mod settings;
pub mod simulator;

pub use error::InitError;
pub use logging::init_logging;
pub use settings::{LogFormat, Settings, SimulatorConfig};
pub use simulator::{service_tx, UartSimulator};

use clap::Parser;
use ingest_controller::{IngestController, IngestHooks};
use ingest_state::{ErrorKind, IngestState, StatsSnapshot, Subsystem};
use sensor_record::{MonotonicTicks, Record, RecordParser};
use serial_link::{MockUart, SerialLink};
use std::io::{self, Read, Write};
use std::sync::atomic::AtomicBool;
use std::thread;
use storage::{MemoryStore, StoreAdapter};
use tracing::{debug, error, info};

/// Command line
#[derive(Debug, Clone, Parser)]
#[command(name = "ingestd", version)]
#[command(
    about = "Feeds a byte stream through a simulated UART into the sensor ingest pipeline",
    long_about = None
)]
#[command(
    after_help = "Environment variables prefixed INGEST_ override settings, with __ between nested keys (INGEST_STORE__HOST=db.local)."
)]
pub struct Args {
    /// Settings file (toml, yaml, json, ...)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<String>,

    /// Input file; `-` or nothing reads stdin
    #[arg(value_name = "INPUT")]
    pub input: Option<String>,
}

impl Args {
    /// Input path, `None` for stdin
    pub fn input_path(&self) -> Option<&str> {
        self.input.as_deref().filter(|path| *path != "-")
    }
}

/// Logs every stored record and every error reported on the ingest path
struct RecordLog;

impl IngestHooks for RecordLog {
    fn on_record(&mut self, record: &Record) {
        info!("Sensor data: {}", record);
    }

    fn on_error(&mut self, subsystem: Subsystem, kind: ErrorKind) {
        debug!("{} error: {}", subsystem.name(), kind.label());
    }
}

fn open_input(path: Option<&str>) -> Result<Box<dyn Read + Send>, InitError> {
    match path {
        None => Ok(Box::new(io::stdin())),
        Some(path) => std::fs::File::open(path)
            .map(|file| Box::new(io::BufReader::new(file)) as Box<dyn Read + Send>)
            .map_err(|source| InitError::Input {
                path: path.to_string(),
                source,
            }),
    }
}

/// Load settings, install logging and run the pipeline over the input
pub fn run(args: &Args) -> Result<StatsSnapshot, InitError> {
    let settings = Settings::load(args.config.as_deref())?;
    init_logging(&settings.log_level, settings.log_format)?;

    info!("=== Sensor Ingest v{} ===", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &args.config {
        info!("Settings loaded from {}", path);
    }

    ingest(
        &settings,
        MockUart::new(),
        MemoryStore::new(),
        args.input_path(),
        &mut io::stdout(),
    )
}

/// Run the init sequence over `uart` and `store`, then the main loop until
/// the input is exhausted.
///
/// Bytes the UART transmits are written to `out`.
pub fn ingest<S, W>(
    settings: &Settings,
    uart: MockUart,
    mut store: S,
    input: Option<&str>,
    out: &mut W,
) -> Result<StatsSnapshot, InitError>
where
    S: StoreAdapter,
    W: Write + Send,
{
    settings.controller.validate()?;

    let parser = RecordParser::with_limits(settings.parser.clone(), MonotonicTicks::new())
        .map_err(InitError::SensorData)?;
    info!("Sensor data parser ready");

    let state = IngestState::new();
    state.clear();
    let link = SerialLink::new(uart, &state);
    link.configure(&settings.uart).map_err(InitError::Comm)?;
    let reader = open_input(input)?;

    settings.store.validate().map_err(InitError::DbInit)?;
    store.connect(&settings.store).map_err(InitError::DbConnect)?;
    store.create_tables().map_err(InitError::TableCreate)?;
    info!("Database ready");

    let mut controller = IngestController::new(
        &link,
        store,
        settings.store.clone(),
        parser,
        settings.controller.clone(),
    )?;
    controller.set_hooks(Box::new(RecordLog));
    link.set_interrupts(true);

    let mut simulator = UartSimulator::new(
        &link,
        reader,
        settings.simulator.clone(),
        settings.uart.baud_rate,
    );
    let shutdown = AtomicBool::new(false);

    let snapshot = thread::scope(|s| {
        let feeder = s.spawn(|| simulator.run(out, &shutdown));
        let snapshot = controller.run(&shutdown);
        match feeder.join() {
            Ok(Ok(fed)) => debug!("Simulator delivered {} bytes", fed),
            Ok(Err(e)) => error!("Input stopped early: {}", e),
            Err(_) => error!("Simulator thread panicked"),
        }
        snapshot
    });

    if let Err(e) = service_tx(&link, out) {
        debug!("Final TX flush failed: {}", e);
    }
    if let Some(counts) = controller.store().row_counts() {
        info!("Rows stored: {}", counts);
    }
    Ok(snapshot)
}
