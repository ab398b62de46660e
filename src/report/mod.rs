//! Report assembly
//!
//! Collects the analysis outputs into one report value, rendered either
//! as the comparative text report or as JSON for downstream tooling.
//! Chart rendering happens elsewhere; renderers consume the event
//! boundary markers exposed by the excursion reports.

use crate::analysis::demand::DemandMaxima;
use crate::analysis::energy::EnergySummary;
use crate::analysis::events::ExcursionReport;
use crate::core::{Error, Result, TimeBlock};
use crate::tariffs::BillBreakdown;
use chrono::Duration;
use serde::Serialize;
use std::fmt::Write;

/// Excursion and outage scan results for the monitored channels
#[derive(Debug, Clone, Serialize)]
pub struct PowerQualitySection {
    pub voltage_high: ExcursionReport,
    pub voltage_low: ExcursionReport,
    pub frequency_high: ExcursionReport,
    pub frequency_low: ExcursionReport,
    pub outages: ExcursionReport,
}

/// Simulated bills for one rate period
#[derive(Debug, Clone, Serialize)]
pub struct TariffComparison {
    pub period: String,
    pub bills: Vec<BillBreakdown>,
}

impl TariffComparison {
    /// Bill with the lowest total
    pub fn cheapest(&self) -> Option<&BillBreakdown> {
        self.bills
            .iter()
            .min_by(|a, b| a.total.partial_cmp(&b.total).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// Everything the analysis produced for one logger export
#[derive(Debug, Clone, Serialize)]
pub struct FullReport {
    pub energy: EnergySummary,
    pub demand: Option<DemandMaxima>,
    pub power_factor: Option<f64>,
    pub quality: PowerQualitySection,
    pub comparison: TariffComparison,
}

impl FullReport {
    /// Machine-readable rendition
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Comparative text report
    pub fn render(&self, currency: &str) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "===== TARIFF COMPARISON REPORT =====");
        let _ = writeln!(
            out,
            "Measured energy:          {:.2} kWh over {:.1} days",
            self.energy.measured_kwh, self.energy.span_days
        );
        match self.energy.extrapolated_kwh {
            Some(kwh) => {
                let _ = writeln!(out, "Extrapolated to 30 days:  {:.2} kWh", kwh);
            }
            None => {
                let _ = writeln!(out, "Extrapolated to 30 days:  n/a (window too short)");
            }
        }

        let _ = writeln!(out, "\nConsumption by block (kWh, extrapolated):");
        let blocks = self
            .energy
            .extrapolated_by_block
            .unwrap_or(self.energy.measured_by_block);
        for block in TimeBlock::ALL {
            let _ = writeln!(out, "  {:<16} {:>10.2}", block.label(), blocks.get(block));
        }

        match &self.demand {
            Some(maxima) => {
                let _ = writeln!(
                    out,
                    "\nMaximum demand (15-min estimate): {:.2} kW at {}",
                    maxima.kw, maxima.at
                );
                let _ = writeln!(out, "Maximum demand by block (kW):");
                for block in TimeBlock::ALL {
                    let slot = maxima.by_block.get(block);
                    match slot.at {
                        Some(at) => {
                            let _ = writeln!(
                                out,
                                "  {:<16} {:>10.2}  at {}",
                                block.label(),
                                slot.kw,
                                at
                            );
                        }
                        None => {
                            let _ = writeln!(
                                out,
                                "  {:<16} {:>10.2}  (no samples)",
                                block.label(),
                                slot.kw
                            );
                        }
                    }
                }
            }
            None => {
                let _ = writeln!(out, "\nMaximum demand: n/a (series too short to smooth)");
            }
        }

        match self.power_factor {
            Some(pf) => {
                let _ = writeln!(out, "\nMonthly power factor: {:.4}", pf);
            }
            None => {
                let _ = writeln!(out, "\nMonthly power factor: n/a");
            }
        }

        let _ = writeln!(out, "\n--- POWER QUALITY ---");
        render_excursions(&mut out, "High voltage", "V", &self.quality.voltage_high, ">");
        render_excursions(&mut out, "Low voltage", "V", &self.quality.voltage_low, "<");
        render_excursions(&mut out, "High frequency", "Hz", &self.quality.frequency_high, ">");
        render_excursions(&mut out, "Low frequency", "Hz", &self.quality.frequency_low, "<");
        render_outages(&mut out, &self.quality.outages);

        let _ = writeln!(
            out,
            "\n--- RESULTS BY TARIFF (period {}) ---",
            self.comparison.period
        );
        for bill in &self.comparison.bills {
            let _ = writeln!(out, "TARIFF {}:", bill.tariff);
            let _ = writeln!(out, "  Energy charge:  {} {:>10.2}", currency, bill.energy_charge);
            let _ = writeln!(out, "  Demand charge:  {} {:>10.2}", currency, bill.demand_charge);
            let _ = writeln!(out, "  PF penalty:     {} {:>10.2}", currency, bill.pf_penalty);
            let _ = writeln!(out, "  TOTAL:          {} {:>10.2}", currency, bill.total);
        }
        if let Some(best) = self.comparison.cheapest() {
            let _ = writeln!(
                out,
                "\nCheapest tariff: {} ({} {:.2})",
                best.tariff, currency, best.total
            );
        }

        out
    }
}

fn render_excursions(
    out: &mut String,
    label: &str,
    unit: &str,
    report: &ExcursionReport,
    sense: &str,
) {
    let header = format!("{} ({} {:.2} {})", label, sense, report.enter_limit, unit);
    if report.events.is_empty() {
        let _ = writeln!(out, "{:<28} none", header);
        return;
    }
    let _ = writeln!(
        out,
        "{:<28} {} event(s), total {}",
        header,
        report.count(),
        format_duration(report.total_duration())
    );
    if let Some(worst) = report.worst() {
        let _ = writeln!(out, "{:<28} worst {:.2} {} at {}", "", worst.value, unit, worst.timestamp);
    }
}

fn render_outages(out: &mut String, report: &ExcursionReport) {
    if report.events.is_empty() {
        let _ = writeln!(out, "{:<28} none", "Outages");
        return;
    }
    let _ = writeln!(
        out,
        "{:<28} {} event(s), total {}",
        "Outages",
        report.count(),
        format_duration(report.total_duration())
    );
    for event in &report.events {
        let _ = writeln!(out, "  {} .. {}", event.start, event.end);
    }
}

fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes();
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::events;
    use crate::core::{LimitsConfig, PerBlock, Sample};
    use crate::tariffs::{BillingInput, Tariff, TariffSchedule};
    use chrono::NaiveDate;

    fn sample_report() -> FullReport {
        let monday = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let voltage: Vec<Sample> = (0..6)
            .map(|i| {
                Sample::new(
                    monday.and_hms_opt(10, i, 0).unwrap(),
                    if i == 2 { 260.0 } else { 240.0 },
                )
            })
            .collect();
        let limits = LimitsConfig::default();
        let (voltage_high, voltage_low) = events::scan_voltage("Tensión L12", &voltage, &limits);
        let (frequency_high, frequency_low) = events::scan_frequency("Frecuencia", &[], &limits);
        let outages = events::scan_outages("Tensión L12", &voltage, &limits);

        let period = TariffSchedule::builtin().period("2025-JUL-DIC").unwrap().clone();
        let input = BillingInput {
            consumption: PerBlock {
                peak: 100.0,
                off_peak_mid: 200.0,
                off_peak_low: 300.0,
            },
            power_factor: Some(0.92),
            max_demand: PerBlock {
                peak: 12.0,
                off_peak_mid: 10.0,
                off_peak_low: 8.0,
            },
        };
        let bills = Tariff::ALL.iter().map(|&t| period.bill(t, &input)).collect();

        FullReport {
            energy: crate::analysis::energy::energy_summary(&[], None),
            demand: None,
            power_factor: Some(0.92),
            quality: PowerQualitySection {
                voltage_high,
                voltage_low,
                frequency_high,
                frequency_low,
                outages,
            },
            comparison: TariffComparison {
                period: "2025-JUL-DIC".to_string(),
                bills,
            },
        }
    }

    #[test]
    fn test_render_mentions_all_tariffs() {
        let text = sample_report().render("B/.");
        for code in ["BTS", "BTSH", "BTD", "BTH", "MTD", "MTH"] {
            assert!(text.contains(&format!("TARIFF {}:", code)), "missing {code}");
        }
        assert!(text.contains("Cheapest tariff:"));
        assert!(text.contains("High voltage"));
    }

    #[test]
    fn test_cheapest_bill() {
        let report = sample_report();
        let cheapest = report.comparison.cheapest().unwrap();
        for bill in &report.comparison.bills {
            assert!(cheapest.total <= bill.total);
        }
    }

    #[test]
    fn test_json_rendition() {
        let json = sample_report().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("comparison").is_some());
        assert!(value.get("quality").is_some());
        assert_eq!(value["power_factor"], 0.92);
    }
}
