//! Configuration management
//!
//! Analysis limits, demand-estimator parameters and channel-name mapping.
//! Loaded once from a TOML file (or built from defaults) and passed by
//! reference into the analysis pipeline; never mutated afterwards.

use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub demand: DemandConfig,
    #[serde(default)]
    pub billing: BillingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Channel-name mapping for the logger export
///
/// Column headers as written by the logger (Latin-1, Spanish). Overridable
/// for firmware variants that rename columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Timestamp column name
    #[serde(default = "default_timestamp_channel")]
    pub timestamp: String,
    /// strftime-style format of the timestamp column
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
    /// Line-to-line voltage channel used for excursion and outage scans
    #[serde(default = "default_line_voltage_channel")]
    pub line_voltage: String,
    /// Frequency channel
    #[serde(default = "default_frequency_channel")]
    pub frequency: String,
    /// Net three-phase active power (derived during preprocessing)
    #[serde(default = "default_active_power_channel")]
    pub active_power: String,
    /// Active energy per sample (derived during preprocessing)
    #[serde(default = "default_active_energy_channel")]
    pub active_energy: String,
    /// Reactive energy per sample (derived during preprocessing)
    #[serde(default = "default_reactive_energy_channel")]
    pub reactive_energy: String,
}

fn default_timestamp_channel() -> String { "Fecha/hora".to_string() }
fn default_timestamp_format() -> String { "%d/%m/%y %H:%M:%S".to_string() }
fn default_line_voltage_channel() -> String { "Tensión L12".to_string() }
fn default_frequency_channel() -> String { "Frecuencia".to_string() }
fn default_active_power_channel() -> String { "P.Activa III T".to_string() }
fn default_active_energy_channel() -> String { "E.Activa III T".to_string() }
fn default_reactive_energy_channel() -> String { "E.Reactiva III M".to_string() }

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            timestamp: default_timestamp_channel(),
            timestamp_format: default_timestamp_format(),
            line_voltage: default_line_voltage_channel(),
            frequency: default_frequency_channel(),
            active_power: default_active_power_channel(),
            active_energy: default_active_energy_channel(),
            reactive_energy: default_reactive_energy_channel(),
        }
    }
}

/// Power-quality limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Nominal line-to-line voltage in volts
    #[serde(default = "default_voltage_nominal")]
    pub voltage_nominal: f64,
    /// Permitted band around nominal voltage, as a fraction (0.05 = ±5%)
    #[serde(default = "default_voltage_band_pct")]
    pub voltage_band_pct: f64,
    /// Hysteresis margin for voltage detectors, in volts
    #[serde(default = "default_voltage_hysteresis")]
    pub voltage_hysteresis: f64,
    /// Nominal frequency in Hz
    #[serde(default = "default_frequency_nominal")]
    pub frequency_nominal: f64,
    /// Permitted deviation from nominal frequency, in Hz
    #[serde(default = "default_frequency_tolerance")]
    pub frequency_tolerance: f64,
    /// Hysteresis margin for frequency detectors, in Hz
    #[serde(default = "default_frequency_hysteresis")]
    pub frequency_hysteresis: f64,
    /// Voltage at or below this level counts as an outage, in volts
    #[serde(default)]
    pub outage_threshold: f64,
    /// Events closer than this many minutes are merged into one
    #[serde(default = "default_merge_gap_minutes")]
    pub merge_gap_minutes: i64,
}

fn default_voltage_nominal() -> f64 { 240.0 }
fn default_voltage_band_pct() -> f64 { 0.05 }
fn default_voltage_hysteresis() -> f64 { 1.0 }
fn default_frequency_nominal() -> f64 { 60.0 }
fn default_frequency_tolerance() -> f64 { 0.5 }
fn default_frequency_hysteresis() -> f64 { 0.05 }
fn default_merge_gap_minutes() -> i64 { 10 }

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            voltage_nominal: default_voltage_nominal(),
            voltage_band_pct: default_voltage_band_pct(),
            voltage_hysteresis: default_voltage_hysteresis(),
            frequency_nominal: default_frequency_nominal(),
            frequency_tolerance: default_frequency_tolerance(),
            frequency_hysteresis: default_frequency_hysteresis(),
            outage_threshold: 0.0,
            merge_gap_minutes: default_merge_gap_minutes(),
        }
    }
}

/// Demand estimator parameters
///
/// The reference logger integrates demand with five virtual meters that
/// refresh every five minutes, approximating a continuous 15-minute window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandConfig {
    /// Number of staggered sub-series
    #[serde(default = "default_phase_count")]
    pub phase_count: usize,
    /// Rolling-mean window length in samples (1-minute samples)
    #[serde(default = "default_window_minutes")]
    pub window_minutes: usize,
}

fn default_phase_count() -> usize { 5 }
fn default_window_minutes() -> usize { 15 }

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            phase_count: default_phase_count(),
            window_minutes: default_window_minutes(),
        }
    }
}

/// Billing defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Rate period key, e.g. "2025-JUL-DIC"
    #[serde(default = "default_period")]
    pub period: String,
    /// Currency symbol used in reports
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_period() -> String { "2025-JUL-DIC".to_string() }
fn default_currency_symbol() -> String { "B/.".to_string() }

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            period: default_period(),
            currency_symbol: default_currency_symbol(),
        }
    }
}
