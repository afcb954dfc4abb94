//! Sensor Ingest Daemon - Main Entry Point

use clap::Parser;
use ingestd::{run, Args};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(snapshot) => {
            eprintln!("{}", snapshot);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
