//! MeterWatch - quick energy summary
//!
//! Minimal companion tool: loads a logger export and prints the measured
//! and 30-day-extrapolated active energy.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use meterwatch_lib::analysis::energy::energy_summary;
use meterwatch_lib::core::Config;
use meterwatch_lib::ingest::MeterFrame;
use meterwatch_lib::preprocess;

#[derive(Parser, Debug)]
#[command(name = "meterwatch-energy", version, about = "Measured and 30-day active energy from a logger export")]
struct Args {
    /// Logger CSV/TXT export
    csv: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = Config::default();

    let raw = MeterFrame::from_path(&args.csv, &config.channels)
        .with_context(|| format!("loading {}", args.csv.display()))?;
    let (mut frame, _) = preprocess::split_harmonics(&raw);
    preprocess::derive_power_channels(&mut frame).context("deriving power channels")?;

    let samples = frame.samples(&config.channels.active_energy)?;
    let summary = energy_summary(&samples, None);

    println!("Measured energy : {:.2} kWh", summary.measured_kwh);
    match summary.extrapolated_kwh {
        Some(kwh) => println!("30-day energy   : {:.2} kWh", kwh),
        None => println!("30-day energy   : n/a (window too short)"),
    }
    Ok(())
}
