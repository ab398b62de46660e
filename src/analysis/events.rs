//! Excursion and outage event detection
//!
//! A hysteresis gate turns a raw signal into a boolean excursion state
//! series, the extractor turns edges into raw (start, end) intervals, and
//! the merger coalesces intervals separated by less than the configured
//! gap, attaching the worst value seen inside each final event.

use crate::core::{ExcursionEvent, ExcursionKind, Extremum, LimitsConfig, Sample};
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

/// Asymmetric detection thresholds around a reference value
///
/// Invariant: `enter_high > exit_high >= exit_low > enter_low`. A value
/// oscillating around a single limit therefore cannot open and close
/// events repeatedly; it has to travel the hysteresis margin first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Band {
    pub enter_high: f64,
    pub exit_high: f64,
    pub enter_low: f64,
    pub exit_low: f64,
}

impl Band {
    /// Band from a nominal value, a fractional width and a hysteresis margin
    ///
    /// E.g. 240 V, 5%, 1 V → enter above 252 V, release below 251 V,
    /// enter below 228 V, release above 229 V.
    pub fn from_percent(nominal: f64, band_pct: f64, margin: f64) -> Self {
        let high = nominal * (1.0 + band_pct);
        let low = nominal * (1.0 - band_pct);
        Self {
            enter_high: high,
            exit_high: high - margin,
            enter_low: low,
            exit_low: low + margin,
        }
    }

    /// Band from a nominal value, an absolute tolerance and a margin
    pub fn from_tolerance(nominal: f64, tolerance: f64, margin: f64) -> Self {
        let high = nominal + tolerance;
        let low = nominal - tolerance;
        Self {
            enter_high: high,
            exit_high: high - margin,
            enter_low: low,
            exit_low: low + margin,
        }
    }

    /// (enter, exit) pair for the high-side detector
    pub fn high(&self) -> (f64, f64) {
        (self.enter_high, self.exit_high)
    }

    /// (enter, exit) pair for the low-side detector
    pub fn low(&self) -> (f64, f64) {
        (self.enter_low, self.exit_low)
    }
}

/// Detector state before and after the first decisive sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    /// No sample has crossed either threshold yet; renders as inactive
    Unknown,
    Active,
    Inactive,
}

/// Two-threshold state machine for one side of a band
///
/// Crossing the enter threshold activates, recrossing the exit threshold
/// (closer to nominal) deactivates, anything in between holds the previous
/// resolved state. Leading samples that never cross either threshold
/// resolve to inactive.
#[derive(Debug, Clone)]
pub struct HysteresisGate {
    enter: f64,
    exit: f64,
    above: bool,
    state: GateState,
}

impl HysteresisGate {
    /// Gate that activates when the value rises past `enter`
    pub fn above(enter: f64, exit: f64) -> Self {
        debug_assert!(enter > exit);
        Self {
            enter,
            exit,
            above: true,
            state: GateState::Unknown,
        }
    }

    /// Gate that activates when the value falls past `enter`
    pub fn below(enter: f64, exit: f64) -> Self {
        debug_assert!(enter < exit);
        Self {
            enter,
            exit,
            above: false,
            state: GateState::Unknown,
        }
    }

    /// Feed one sample; returns whether the gate is active afterwards
    pub fn step(&mut self, value: f64) -> bool {
        let entered = if self.above {
            value > self.enter
        } else {
            value < self.enter
        };
        let exited = if self.above {
            value < self.exit
        } else {
            value > self.exit
        };

        if entered {
            self.state = GateState::Active;
        } else if exited {
            self.state = GateState::Inactive;
        }
        self.state == GateState::Active
    }
}

/// Run a gate over a sample series, producing the excursion state series
///
/// `exclude_zero` masks samples with a value of exactly zero: a dead
/// reading means the measurement is absent (or the supply is out), not
/// that the signal sagged to zero.
pub fn excursion_states(samples: &[Sample], mut gate: HysteresisGate, exclude_zero: bool) -> Vec<bool> {
    samples
        .iter()
        .map(|s| {
            let active = gate.step(s.value);
            active && !(exclude_zero && s.value == 0.0)
        })
        .collect()
}

/// A raw event interval before merging and enrichment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Turn a boolean state series into raw (start, end) intervals
///
/// A rising edge opens an event at that sample, a falling edge closes it
/// at that sample. A series that starts true opens at the first timestamp;
/// an event still open at the end closes at the last timestamp. The input
/// is re-sorted chronologically first.
pub fn extract_events(series: &[(NaiveDateTime, bool)]) -> Vec<RawEvent> {
    let mut series = series.to_vec();
    series.sort_by_key(|&(ts, _)| ts);

    let mut events = Vec::new();
    let mut open: Option<NaiveDateTime> = None;
    let mut prev = false;
    for &(ts, state) in &series {
        match (prev, state) {
            (false, true) => open = Some(ts),
            (true, false) => {
                if let Some(start) = open.take() {
                    events.push(RawEvent { start, end: ts });
                }
            }
            _ => {}
        }
        prev = state;
    }
    if let (Some(start), Some(&(last, _))) = (open, series.last()) {
        events.push(RawEvent { start, end: last });
    }
    events
}

/// Merge close events and attach each event's extremum
///
/// Events whose start follows the running accumulator's end by at most
/// `max_gap` are folded into it. High events carry their maximum, low
/// events their minimum (first occurrence wins on ties); outages carry no
/// extremum. A merge window with no source samples yields an absent
/// extremum rather than an error.
pub fn merge_events(
    events: &[RawEvent],
    max_gap: Duration,
    source: &[Sample],
    kind: ExcursionKind,
) -> Vec<ExcursionEvent> {
    let mut merged: Vec<RawEvent> = Vec::new();
    for event in events {
        match merged.last_mut() {
            Some(acc) if event.start - acc.end <= max_gap => {
                if event.end > acc.end {
                    acc.end = event.end;
                }
            }
            _ => merged.push(*event),
        }
    }

    merged
        .into_iter()
        .map(|raw| {
            let extremum = match kind {
                ExcursionKind::Outage => None,
                ExcursionKind::High => extremum_in(source, raw.start, raw.end, true),
                ExcursionKind::Low => extremum_in(source, raw.start, raw.end, false),
            };
            ExcursionEvent {
                kind,
                start: raw.start,
                end: raw.end,
                extremum,
            }
        })
        .collect()
}

fn extremum_in(source: &[Sample], start: NaiveDateTime, end: NaiveDateTime, want_max: bool) -> Option<Extremum> {
    let mut best: Option<Extremum> = None;
    for s in source {
        if s.timestamp < start || s.timestamp > end {
            continue;
        }
        let better = match best {
            None => true,
            Some(b) => {
                if want_max {
                    s.value > b.value
                } else {
                    s.value < b.value
                }
            }
        };
        if better {
            best = Some(Extremum {
                value: s.value,
                timestamp: s.timestamp,
            });
        }
    }
    best
}

/// Event-boundary marker for external chart renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventMarker {
    pub timestamp: NaiveDateTime,
    pub color: &'static str,
}

/// Excursion scan result for one channel and one detection side
#[derive(Debug, Clone, Serialize)]
pub struct ExcursionReport {
    pub channel: String,
    pub kind: ExcursionKind,
    /// Threshold that opens an event
    pub enter_limit: f64,
    /// Threshold that closes an event
    pub exit_limit: f64,
    pub events: Vec<ExcursionEvent>,
}

impl ExcursionReport {
    pub fn count(&self) -> usize {
        self.events.len()
    }

    /// Summed duration of all events
    pub fn total_duration(&self) -> Duration {
        self.events
            .iter()
            .fold(Duration::zero(), |acc, e| acc + e.duration())
    }

    /// Worst excursion across all events (absent for outages)
    pub fn worst(&self) -> Option<Extremum> {
        let mut best: Option<Extremum> = None;
        for e in &self.events {
            let Some(x) = e.extremum else { continue };
            let better = match best {
                None => true,
                Some(b) => match self.kind {
                    ExcursionKind::High => x.value > b.value,
                    ExcursionKind::Low => x.value < b.value,
                    ExcursionKind::Outage => false,
                },
            };
            if better {
                best = Some(x);
            }
        }
        best
    }

    /// (timestamp, color) boundary markers for chart renderers
    pub fn boundary_markers(&self) -> Vec<EventMarker> {
        let mut markers = Vec::with_capacity(self.events.len() * 2);
        for e in &self.events {
            markers.push(EventMarker {
                timestamp: e.start,
                color: "red",
            });
            markers.push(EventMarker {
                timestamp: e.end,
                color: "green",
            });
        }
        markers
    }
}

/// Scan one channel for one kind of excursion
pub fn scan(
    channel: &str,
    samples: &[Sample],
    kind: ExcursionKind,
    limits: (f64, f64),
    max_gap: Duration,
) -> ExcursionReport {
    let (enter, exit) = limits;
    let mut samples = samples.to_vec();
    samples.sort_by_key(|s| s.timestamp);

    let states = match kind {
        ExcursionKind::High => excursion_states(&samples, HysteresisGate::above(enter, exit), false),
        ExcursionKind::Low => excursion_states(&samples, HysteresisGate::below(enter, exit), true),
        // Outages have no meaningful hysteresis: the supply is either
        // present or it is not.
        ExcursionKind::Outage => samples.iter().map(|s| s.value <= enter).collect(),
    };

    let series: Vec<(NaiveDateTime, bool)> = samples
        .iter()
        .map(|s| s.timestamp)
        .zip(states)
        .collect();
    let events = merge_events(&extract_events(&series), max_gap, &samples, kind);

    ExcursionReport {
        channel: channel.to_string(),
        kind,
        enter_limit: enter,
        exit_limit: exit,
        events,
    }
}

/// High- and low-voltage scans against the configured voltage band
pub fn scan_voltage(
    channel: &str,
    samples: &[Sample],
    limits: &LimitsConfig,
) -> (ExcursionReport, ExcursionReport) {
    let band = Band::from_percent(
        limits.voltage_nominal,
        limits.voltage_band_pct,
        limits.voltage_hysteresis,
    );
    let gap = Duration::minutes(limits.merge_gap_minutes);
    (
        scan(channel, samples, ExcursionKind::High, band.high(), gap),
        scan(channel, samples, ExcursionKind::Low, band.low(), gap),
    )
}

/// High- and low-frequency scans against the configured tolerance
pub fn scan_frequency(
    channel: &str,
    samples: &[Sample],
    limits: &LimitsConfig,
) -> (ExcursionReport, ExcursionReport) {
    let band = Band::from_tolerance(
        limits.frequency_nominal,
        limits.frequency_tolerance,
        limits.frequency_hysteresis,
    );
    let gap = Duration::minutes(limits.merge_gap_minutes);
    (
        scan(channel, samples, ExcursionKind::High, band.high(), gap),
        scan(channel, samples, ExcursionKind::Low, band.low(), gap),
    )
}

/// Outage scan: supply considered lost at or below the outage threshold
pub fn scan_outages(channel: &str, samples: &[Sample], limits: &LimitsConfig) -> ExcursionReport {
    let gap = Duration::minutes(limits.merge_gap_minutes);
    scan(
        channel,
        samples,
        ExcursionKind::Outage,
        (limits.outage_threshold, limits.outage_threshold),
        gap,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn minute(i: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            + Duration::minutes(i)
    }

    fn series(values: &[f64]) -> Vec<Sample> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample::new(minute(i as i64), v))
            .collect()
    }

    fn limits() -> LimitsConfig {
        LimitsConfig::default()
    }

    #[test]
    fn test_band_invariant() {
        let band = Band::from_percent(240.0, 0.05, 1.0);
        assert_eq!(band.enter_high, 252.0);
        assert_eq!(band.exit_high, 251.0);
        assert_eq!(band.enter_low, 228.0);
        assert_eq!(band.exit_low, 229.0);
        assert!(band.enter_high > band.exit_high);
        assert!(band.exit_high >= band.exit_low);
        assert!(band.exit_low > band.enter_low);
    }

    #[test]
    fn test_constant_in_band_no_events() {
        // 250 V never crosses the 252 V enter threshold
        let samples = series(&[250.0; 10]);
        let (high, low) = scan_voltage("Tensión L12", &samples, &limits());
        assert!(high.events.is_empty());
        assert!(low.events.is_empty());
    }

    #[test]
    fn test_dip_within_gap_merges_to_one_event() {
        // 260 V for 2 min, 245 V for 1 min, 260 V for 2 min
        let samples = series(&[260.0, 260.0, 245.0, 260.0, 260.0]);
        let (high, _) = scan_voltage("Tensión L12", &samples, &limits());

        assert_eq!(high.events.len(), 1);
        let event = &high.events[0];
        assert_eq!(event.start, minute(0));
        assert_eq!(event.end, minute(4));
        assert_eq!(event.duration(), Duration::minutes(4));
        let extremum = event.extremum.unwrap();
        assert_eq!(extremum.value, 260.0);
        assert_eq!(extremum.timestamp, minute(0)); // first occurrence wins
    }

    #[test]
    fn test_hysteresis_holds_through_dither() {
        // Enter at 260, then dither strictly between exit (251) and
        // enter (252): the gate must hold, yielding a single event.
        let mut values = vec![260.0];
        for i in 0..20 {
            values.push(if i % 2 == 0 { 251.4 } else { 251.9 });
        }
        let samples = series(&values);
        let states = excursion_states(&samples, HysteresisGate::above(252.0, 251.0), false);
        assert!(states.iter().all(|&s| s));

        let (high, _) = scan_voltage("Tensión L12", &samples, &limits());
        assert_eq!(high.events.len(), 1);
    }

    #[test]
    fn test_dither_without_entering_yields_nothing() {
        // Same dither but the gate never entered: leading Unknown
        // resolves to inactive.
        let values: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 251.4 } else { 251.9 }).collect();
        let samples = series(&values);
        let states = excursion_states(&samples, HysteresisGate::above(252.0, 251.0), false);
        assert!(states.iter().all(|&s| !s));
    }

    #[test]
    fn test_all_true_series_is_one_spanning_event() {
        let samples = series(&[260.0; 8]);
        let (high, _) = scan_voltage("Tensión L12", &samples, &limits());
        assert_eq!(high.events.len(), 1);
        assert_eq!(high.events[0].start, minute(0));
        assert_eq!(high.events[0].end, minute(7));
    }

    #[test]
    fn test_spike_closes_at_next_sample() {
        let samples = series(&[240.0, 260.0, 240.0]);
        let (high, _) = scan_voltage("Tensión L12", &samples, &limits());
        assert_eq!(high.events.len(), 1);
        // Opens at the spike, closes at the next (false) sample
        assert_eq!(high.events[0].start, minute(1));
        assert_eq!(high.events[0].end, minute(2));
    }

    #[test]
    fn test_trailing_spike_is_zero_duration_event() {
        // Series ends while the event is open: closed at the last sample,
        // here the same one that opened it
        let samples = series(&[240.0, 260.0]);
        let (high, _) = scan_voltage("Tensión L12", &samples, &limits());
        assert_eq!(high.events.len(), 1);
        assert_eq!(high.events[0].start, minute(1));
        assert_eq!(high.events[0].end, minute(1));
        assert_eq!(high.events[0].duration(), Duration::zero());
    }

    #[test]
    fn test_zero_is_not_a_sag() {
        // Dead readings must not register as low-voltage excursions
        let samples = series(&[240.0, 0.0, 0.0, 240.0]);
        let (_, low) = scan_voltage("Tensión L12", &samples, &limits());
        assert!(low.events.is_empty());

        // A genuine sag still does
        let samples = series(&[240.0, 200.0, 200.0, 240.0]);
        let (_, low) = scan_voltage("Tensión L12", &samples, &limits());
        assert_eq!(low.events.len(), 1);
        assert_eq!(low.events[0].extremum.unwrap().value, 200.0);
    }

    #[test]
    fn test_outage_events_carry_no_extremum() {
        let samples = series(&[240.0, 0.0, 0.0, 240.0]);
        let outages = scan_outages("Tensión L12", &samples, &limits());
        assert_eq!(outages.events.len(), 1);
        assert_eq!(outages.events[0].kind, ExcursionKind::Outage);
        assert!(outages.events[0].extremum.is_none());
    }

    #[test]
    fn test_events_beyond_gap_stay_separate() {
        // Two excursions 30 minutes apart with a 10-minute gap tolerance
        let mut values = vec![260.0, 260.0];
        values.extend(std::iter::repeat(240.0).take(30));
        values.extend([260.0, 260.0]);
        let samples = series(&values);
        let (high, _) = scan_voltage("Tensión L12", &samples, &limits());
        assert_eq!(high.events.len(), 2);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let raw = vec![
            RawEvent { start: minute(0), end: minute(2) },
            RawEvent { start: minute(5), end: minute(6) },
            RawEvent { start: minute(40), end: minute(41) },
        ];
        let samples = series(&[260.0; 42]);
        let gap = Duration::minutes(10);

        let merged = merge_events(&raw, gap, &samples, ExcursionKind::High);
        let remerged_input: Vec<RawEvent> = merged
            .iter()
            .map(|e| RawEvent { start: e.start, end: e.end })
            .collect();
        let remerged = merge_events(&remerged_input, gap, &samples, ExcursionKind::High);

        assert_eq!(merged, remerged);
    }

    #[test]
    fn test_merging_grows_coverage() {
        let raw = vec![
            RawEvent { start: minute(0), end: minute(2) },
            RawEvent { start: minute(4), end: minute(6) },
        ];
        let before: Duration = raw
            .iter()
            .fold(Duration::zero(), |acc, e| acc + (e.end - e.start));
        let merged = merge_events(&raw, Duration::minutes(10), &[], ExcursionKind::Outage);

        assert_eq!(merged.len(), 1);
        let after = merged[0].duration();
        assert!(after >= before);
    }

    #[test]
    fn test_empty_merge_window_has_absent_extremum() {
        let raw = vec![RawEvent { start: minute(0), end: minute(2) }];
        let merged = merge_events(&raw, Duration::minutes(10), &[], ExcursionKind::High);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].extremum.is_none());
    }

    #[test]
    fn test_extractor_resorts_unordered_input() {
        let series = vec![
            (minute(2), true),
            (minute(0), false),
            (minute(1), true),
            (minute(3), false),
        ];
        let events = extract_events(&series);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start, minute(1));
        assert_eq!(events[0].end, minute(3));
    }

    #[test]
    fn test_no_true_samples_no_events() {
        let series: Vec<(NaiveDateTime, bool)> = (0..5).map(|i| (minute(i), false)).collect();
        assert!(extract_events(&series).is_empty());
    }

    #[test]
    fn test_boundary_markers() {
        let samples = series(&[260.0, 260.0, 240.0]);
        let (high, _) = scan_voltage("Tensión L12", &samples, &limits());
        let markers = high.boundary_markers();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].color, "red");
        assert_eq!(markers[1].color, "green");
    }

    #[test]
    fn test_frequency_band() {
        // 60 Hz nominal, ±0.5 Hz: 60.7 is high, 59.2 is low
        let samples = series(&[60.0, 60.7, 60.0, 59.2, 60.0]);
        let (high, low) = scan_frequency("Frecuencia", &samples, &limits());
        // The two excursions are 2 minutes apart, within the merge gap,
        // but high and low detectors are independent
        assert_eq!(high.events.len(), 1);
        assert_eq!(low.events.len(), 1);
        assert_eq!(high.events[0].extremum.unwrap().value, 60.7);
        assert_eq!(low.events[0].extremum.unwrap().value, 59.2);
    }
}
