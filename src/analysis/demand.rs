//! Demand smoothing and maximum-demand aggregation
//!
//! Reproduces the reference logger's demand integration: five virtual
//! meters sample the 1-minute active power staggered by one minute each,
//! hold their reading for five minutes, and feed a 15-sample rolling mean;
//! the per-minute demand estimate is the average of the five means.

use crate::analysis::blocks::classify;
use crate::core::{BlockMax, DemandConfig, DemandPoint, PerBlock, Sample};
use chrono::NaiveDateTime;
use serde::Serialize;

/// Smoothed demand estimate aligned to the cleaned input series
#[derive(Debug, Clone, Serialize)]
pub struct DemandSeries {
    pub points: Vec<DemandPoint>,
}

impl DemandSeries {
    /// Global maximum over defined values (first occurrence wins ties)
    pub fn max(&self) -> Option<(NaiveDateTime, f64)> {
        let mut best: Option<(NaiveDateTime, f64)> = None;
        for p in &self.points {
            let Some(kw) = p.smoothed_kw else { continue };
            if best.map_or(true, |(_, b)| kw > b) {
                best = Some((p.timestamp, kw));
            }
        }
        best
    }

    /// Defined points as plain samples, for downstream aggregation
    pub fn defined_samples(&self) -> Vec<Sample> {
        self.points
            .iter()
            .filter_map(|p| p.smoothed_kw.map(|kw| Sample::new(p.timestamp, kw)))
            .collect()
    }
}

/// Compute the smoothed demand series
///
/// Active power is clipped to >= 0 first (generation reads as zero
/// demand) and the series re-sorted chronologically. A smoothed value is
/// defined only once every staggered phase has a full rolling window;
/// partial windows stay explicitly undefined. Returns `None` when fewer
/// than `window_minutes` samples exist or no value ever becomes defined —
/// a normal terminal case, not an error.
pub fn smooth_demand(samples: &[Sample], config: &DemandConfig) -> Option<DemandSeries> {
    let phases = config.phase_count.max(1);
    let window = config.window_minutes.max(1);

    let mut cleaned: Vec<Sample> = samples
        .iter()
        .map(|s| Sample::new(s.timestamp, s.value.max(0.0)))
        .collect();
    cleaned.sort_by_key(|s| s.timestamp);

    if cleaned.len() < window {
        log::debug!(
            "Not enough samples for demand smoothing: {} < {}",
            cleaned.len(),
            window
        );
        return None;
    }

    let raw: Vec<f64> = cleaned.iter().map(|s| s.value).collect();
    let phase_means: Vec<Vec<Option<f64>>> = (0..phases)
        .map(|offset| rolling_mean(&staggered_phase(&raw, offset, phases), window))
        .collect();

    let points: Vec<DemandPoint> = cleaned
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut sum = 0.0;
            let mut defined = 0usize;
            for means in &phase_means {
                if let Some(v) = means[i] {
                    sum += v;
                    defined += 1;
                }
            }
            DemandPoint {
                timestamp: s.timestamp,
                smoothed_kw: (defined == phases).then(|| sum / phases as f64),
            }
        })
        .collect();

    let series = DemandSeries { points };
    if series.max().is_none() {
        return None;
    }
    Some(series)
}

/// Staggered sub-series: the phase holds its latest offset sample for a
/// full stride, absent once the source runs out
fn staggered_phase(values: &[f64], offset: usize, stride: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| values.get(offset + stride * (i / stride)).copied())
        .collect()
}

/// Rolling mean requiring a complete window of present values
fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    for i in (window - 1)..values.len() {
        let mut sum = 0.0;
        let mut count = 0usize;
        for v in &values[i + 1 - window..=i] {
            if let Some(x) = v {
                sum += x;
                count += 1;
            }
        }
        if count == window {
            out[i] = Some(sum / window as f64);
        }
    }
    out
}

/// Maximum demand, overall and per time-of-use block
#[derive(Debug, Clone, Serialize)]
pub struct DemandMaxima {
    pub kw: f64,
    pub at: NaiveDateTime,
    pub by_block: PerBlock<BlockMax>,
}

/// Maximum over a demand series, bucketed by time-of-use block
///
/// The optional range is inclusive on both ends. Blocks with no samples
/// report 0 kW with an absent timestamp. Returns `None` when no samples
/// fall inside the range.
pub fn max_demand_by_block(
    samples: &[Sample],
    range: Option<(NaiveDateTime, NaiveDateTime)>,
) -> Option<DemandMaxima> {
    let mut overall: Option<(NaiveDateTime, f64)> = None;
    let mut by_block: PerBlock<BlockMax> = PerBlock::default();

    for s in samples {
        if let Some((from, to)) = range {
            if s.timestamp < from || s.timestamp > to {
                continue;
            }
        }
        if overall.map_or(true, |(_, best)| s.value > best) {
            overall = Some((s.timestamp, s.value));
        }
        let slot = by_block.get_mut(classify(s.timestamp));
        if slot.at.is_none() || s.value > slot.kw {
            *slot = BlockMax {
                kw: s.value,
                at: Some(s.timestamp),
            };
        }
    }

    overall.map(|(at, kw)| DemandMaxima { kw, at, by_block })
}
