//! Energy summation by time-of-use block
//!
//! Sums per-sample energy into block buckets and extrapolates a full
//! 30-day billing month from the measured span.

use crate::analysis::blocks::classify;
use crate::core::{PerBlock, Sample};
use chrono::NaiveDateTime;
use serde::Serialize;

const BILLING_MONTH_DAYS: f64 = 30.0;

/// Measured and month-extrapolated energy, total and per block
#[derive(Debug, Clone, Serialize)]
pub struct EnergySummary {
    pub measured_kwh: f64,
    pub measured_by_block: PerBlock<f64>,
    /// Span of the summed window in days
    pub span_days: f64,
    /// Absent when the span is zero or negative
    pub extrapolated_kwh: Option<f64>,
    pub extrapolated_by_block: Option<PerBlock<f64>>,
}

/// Sum per-sample energy over an optional inclusive range
///
/// The extrapolation factor is 30 days over the window span; windows with
/// no usable span yield absent extrapolations rather than infinities.
pub fn energy_summary(
    samples: &[Sample],
    range: Option<(NaiveDateTime, NaiveDateTime)>,
) -> EnergySummary {
    let window = range.or_else(|| {
        let first = samples.iter().map(|s| s.timestamp).min()?;
        let last = samples.iter().map(|s| s.timestamp).max()?;
        Some((first, last))
    });

    let mut total = 0.0;
    let mut by_block: PerBlock<f64> = PerBlock::default();
    if let Some((from, to)) = window {
        for s in samples {
            if s.timestamp < from || s.timestamp > to {
                continue;
            }
            total += s.value;
            *by_block.get_mut(classify(s.timestamp)) += s.value;
        }
    }

    let span_days = window
        .map(|(from, to)| (to - from).num_seconds() as f64 / 86_400.0)
        .unwrap_or(0.0);

    let factor = (span_days > 0.0).then(|| BILLING_MONTH_DAYS / span_days);
    EnergySummary {
        measured_kwh: total,
        measured_by_block: by_block,
        span_days,
        extrapolated_kwh: factor.map(|f| total * f),
        extrapolated_by_block: factor.map(|f| PerBlock {
            peak: by_block.peak * f,
            off_peak_mid: by_block.off_peak_mid * f,
            off_peak_low: by_block.off_peak_low * f,
        }),
    }
}
