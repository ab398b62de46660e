//! MeterWatch - Main entry point
//!
//! Loads a power-quality logger export, runs the full analysis pipeline
//! (preprocessing, power factor, demand smoothing, excursion scans,
//! energy aggregation) and prints the comparative tariff report.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::Parser;
use std::path::PathBuf;

use meterwatch_lib::analysis::{demand, energy, events, power_factor};
use meterwatch_lib::core::{Config, PerBlock};
use meterwatch_lib::ingest::MeterFrame;
use meterwatch_lib::preprocess;
use meterwatch_lib::report::{FullReport, PowerQualitySection, TariffComparison};
use meterwatch_lib::tariffs::{BillingInput, Tariff, TariffSchedule};

#[derive(Parser, Debug)]
#[command(
    name = "meterwatch",
    version,
    about = "Power-quality and tariff analysis for electrical meter logs"
)]
struct Args {
    /// Logger CSV/TXT export to analyze
    csv: PathBuf,

    /// Analysis configuration (TOML); built-in defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rate period to bill against (default from configuration)
    #[arg(long)]
    period: Option<String>,

    /// Comma-separated tariff codes to compare (default: all)
    #[arg(long, value_delimiter = ',')]
    tariffs: Vec<String>,

    /// Start date (YYYY-MM-DD) of the billing window
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD) of the billing window, inclusive
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Also print the average-day maximum demand
    #[arg(long)]
    average_day: bool,

    /// Emit the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    let tariffs: Vec<Tariff> = if args.tariffs.is_empty() {
        Tariff::ALL.to_vec()
    } else {
        args.tariffs
            .iter()
            .map(|code| code.parse())
            .collect::<std::result::Result<_, _>>()?
    };

    let range = billing_window(args.start, args.end);

    // Load and preprocess
    let raw = MeterFrame::from_path(&args.csv, &config.channels)
        .with_context(|| format!("loading {}", args.csv.display()))?;
    let (mut frame, harmonics) = preprocess::split_harmonics(&raw);
    let harmonic_count = harmonics.channel_names().count();
    if harmonic_count > 0 {
        log::debug!("Set aside {} harmonic channels", harmonic_count);
    }
    preprocess::derive_power_channels(&mut frame).context("deriving power channels")?;

    let pf = power_factor::monthly_power_factor(&mut frame, &config.channels)?;

    // Demand smoothing and aggregation
    let active_power = frame.samples(&config.channels.active_power)?;
    let demand_series = demand::smooth_demand(&active_power, &config.demand);
    let maxima = demand_series
        .as_ref()
        .and_then(|s| demand::max_demand_by_block(&s.defined_samples(), range));

    let energy_samples = frame.samples(&config.channels.active_energy)?;
    let summary = energy::energy_summary(&energy_samples, range);

    // Excursion and outage scans
    let voltage = frame.samples(&config.channels.line_voltage)?;
    let (voltage_high, voltage_low) =
        events::scan_voltage(&config.channels.line_voltage, &voltage, &config.limits);
    let outages = events::scan_outages(&config.channels.line_voltage, &voltage, &config.limits);
    let frequency = frame.samples(&config.channels.frequency)?;
    let (frequency_high, frequency_low) =
        events::scan_frequency(&config.channels.frequency, &frequency, &config.limits);

    // Billing
    let consumption = summary
        .extrapolated_by_block
        .unwrap_or(summary.measured_by_block);
    let max_demand = maxima
        .as_ref()
        .map(|m| PerBlock {
            peak: m.by_block.peak.kw,
            off_peak_mid: m.by_block.off_peak_mid.kw,
            off_peak_low: m.by_block.off_peak_low.kw,
        })
        .unwrap_or_default();
    let input = BillingInput {
        consumption,
        power_factor: pf,
        max_demand,
    };

    let schedule = TariffSchedule::builtin();
    let period_key = args
        .period
        .unwrap_or_else(|| config.billing.period.clone());
    let period = schedule.period(&period_key)?;
    let bills = tariffs.iter().map(|&t| period.bill(t, &input)).collect();

    let report = FullReport {
        energy: summary,
        demand: maxima,
        power_factor: pf,
        quality: PowerQualitySection {
            voltage_high,
            voltage_low,
            frequency_high,
            frequency_low,
            outages,
        },
        comparison: TariffComparison {
            period: period_key,
            bills,
        },
    };

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render(&config.billing.currency_symbol));
    }

    if args.average_day {
        print_average_day(&frame, &config)?;
    }

    Ok(())
}

/// Inclusive billing window from the optional CLI dates
fn billing_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Option<(NaiveDateTime, NaiveDateTime)> {
    match (start, end) {
        (Some(start), Some(end)) => Some((at_midnight(start), at_day_end(end))),
        (Some(start), None) => Some((at_midnight(start), at_day_end(NaiveDate::MAX))),
        (None, Some(end)) => Some((at_midnight(NaiveDate::MIN), at_day_end(end))),
        (None, None) => None,
    }
}

fn at_midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or(NaiveDateTime::MIN)
}

fn at_day_end(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 0).unwrap_or(NaiveDateTime::MAX)
}

/// Smooth the average-day profile and print its maximum demand
fn print_average_day(frame: &MeterFrame, config: &Config) -> Result<()> {
    let profile = preprocess::daily_profile(frame, None);
    let samples = profile.samples(&config.channels.active_power)?;
    match demand::smooth_demand(&samples, &config.demand).and_then(|s| s.max()) {
        Some((at, kw)) => {
            println!(
                "\nAverage-day maximum demand: {:.2} kW at {}",
                kw,
                at.format("%H:%M")
            );
        }
        None => {
            println!("\nAverage-day maximum demand: n/a (profile too short to smooth)");
        }
    }
    Ok(())
}
