//! Common types used across the application

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A single timestamped measurement from one meter channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Timestamp of the reading
    pub timestamp: NaiveDateTime,
    /// Measured value (units depend on the channel)
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Utility time-of-use block (Edemet convention)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBlock {
    /// Weekday 09:00-17:00
    Peak,
    /// Weekday evenings and Saturday 11:00-22:59
    OffPeakMid,
    /// Nights, early mornings and Sundays
    OffPeakLow,
}

impl TimeBlock {
    /// All blocks, in tariff-table order
    pub const ALL: [TimeBlock; 3] = [TimeBlock::Peak, TimeBlock::OffPeakMid, TimeBlock::OffPeakLow];

    /// Human-readable label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            TimeBlock::Peak => "peak",
            TimeBlock::OffPeakMid => "off-peak (mid)",
            TimeBlock::OffPeakLow => "off-peak (low)",
        }
    }
}

/// A value per time-of-use block, with exhaustive fields
///
/// Every block is always present, so lookups cannot miss a key or insert
/// defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerBlock<T> {
    pub peak: T,
    pub off_peak_mid: T,
    pub off_peak_low: T,
}

impl<T> PerBlock<T> {
    pub fn get(&self, block: TimeBlock) -> &T {
        match block {
            TimeBlock::Peak => &self.peak,
            TimeBlock::OffPeakMid => &self.off_peak_mid,
            TimeBlock::OffPeakLow => &self.off_peak_low,
        }
    }

    pub fn get_mut(&mut self, block: TimeBlock) -> &mut T {
        match block {
            TimeBlock::Peak => &mut self.peak,
            TimeBlock::OffPeakMid => &mut self.off_peak_mid,
            TimeBlock::OffPeakLow => &mut self.off_peak_low,
        }
    }
}

impl PerBlock<f64> {
    /// Sum over the three blocks
    pub fn total(&self) -> f64 {
        self.peak + self.off_peak_mid + self.off_peak_low
    }

    /// Largest block value
    pub fn max(&self) -> f64 {
        self.peak.max(self.off_peak_mid).max(self.off_peak_low)
    }
}

/// Kind of excursion a detector reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExcursionKind {
    /// Signal above its permitted band
    High,
    /// Signal below its permitted band
    Low,
    /// Supply lost (signal at/below the outage threshold)
    Outage,
}

/// Worst value observed inside an excursion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extremum {
    pub value: f64,
    pub timestamp: NaiveDateTime,
}

/// A contiguous interval during which a signal stayed outside its band
///
/// Built by the event extractor, enriched by the merger, immutable after
/// that. `start == end` is a valid single-sample excursion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcursionEvent {
    pub kind: ExcursionKind,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Absent for outages and for merge windows with no source samples
    pub extremum: Option<Extremum>,
}

impl ExcursionEvent {
    /// Duration of the excursion (may be zero for single-sample events)
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Maximum value seen inside one time-of-use block
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockMax {
    /// 0.0 when the block had no defined samples
    pub kw: f64,
    /// Absent when the block had no defined samples
    pub at: Option<NaiveDateTime>,
}

/// One point of the smoothed demand estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandPoint {
    pub timestamp: NaiveDateTime,
    /// Absent until every staggered phase has a full rolling window
    pub smoothed_kw: Option<f64>,
}
