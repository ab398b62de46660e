//! Meter-log ingestion
//!
//! Loads the logger's CSV/TXT export into an in-memory [`MeterFrame`].
//! Exports are Latin-1 encoded, comma-separated, with Spanish column
//! headers and a `Fecha/hora` timestamp column.

use crate::core::{ChannelsConfig, Error, Result, Sample};
use chrono::NaiveDateTime;
use std::fs;
use std::path::Path;

/// In-memory tabular time series: parsed timestamps plus named channels
///
/// Channel values keep explicit absents for blank or unparseable cells;
/// they are never silently replaced with zero. Rows are kept in stable
/// chronological order (equal timestamps keep file order).
#[derive(Debug, Clone)]
pub struct MeterFrame {
    timestamps: Vec<NaiveDateTime>,
    channels: Vec<(String, Vec<Option<f64>>)>,
}

impl MeterFrame {
    /// Create an empty frame over the given timestamps
    pub fn new(timestamps: Vec<NaiveDateTime>) -> Self {
        Self {
            timestamps,
            channels: Vec::new(),
        }
    }

    /// Load a logger export from disk
    pub fn from_path(path: &Path, channels: &ChannelsConfig) -> Result<Self> {
        let bytes = fs::read(path)?;
        let text = decode_latin1(&bytes);
        Self::from_csv(&text, channels)
    }

    /// Parse a logger export from already-decoded CSV text
    pub fn from_csv(text: &str, channels: &ChannelsConfig) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let ts_index = headers
            .iter()
            .position(|h| h.trim() == channels.timestamp)
            .ok_or_else(|| Error::MissingChannel(channels.timestamp.clone()))?;

        let names: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != ts_index)
            .map(|(i, h)| (i, h.trim().to_string()))
            .collect();

        let mut timestamps = Vec::new();
        let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); names.len()];
        let mut dropped = 0usize;

        for record in reader.records() {
            let record = record?;
            let raw_ts = record.get(ts_index).unwrap_or("").trim();
            let ts = match NaiveDateTime::parse_from_str(raw_ts, &channels.timestamp_format) {
                Ok(ts) => ts,
                Err(_) => {
                    dropped += 1;
                    continue;
                }
            };
            timestamps.push(ts);
            for (col, (index, _)) in columns.iter_mut().zip(&names) {
                let value = record
                    .get(*index)
                    .and_then(|cell| cell.trim().parse::<f64>().ok())
                    .filter(|v| v.is_finite());
                col.push(value);
            }
        }

        if dropped > 0 {
            log::debug!("Dropped {} rows with unparseable timestamps", dropped);
        }
        log::info!("Loaded {} rows, {} channels", timestamps.len(), names.len());

        let mut frame = Self {
            timestamps,
            channels: names
                .into_iter()
                .map(|(_, name)| name)
                .zip(columns)
                .collect(),
        };
        frame.sort_by_timestamp();
        Ok(frame)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Row timestamps, chronological
    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// Channel names in column order
    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|(name, _)| name.as_str())
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.iter().any(|(n, _)| n == name)
    }

    /// All channels as (name, values) pairs, in column order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.channels
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Raw channel values, aligned to [`Self::timestamps`]
    ///
    /// Fails fast naming the channel when it is absent.
    pub fn channel(&self, name: &str) -> Result<&[Option<f64>]> {
        self.channels
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
            .ok_or_else(|| Error::MissingChannel(name.to_string()))
    }

    /// Channel as (timestamp, value) samples, rows with absent values skipped
    pub fn samples(&self, name: &str) -> Result<Vec<Sample>> {
        let values = self.channel(name)?;
        Ok(self
            .timestamps
            .iter()
            .zip(values)
            .filter_map(|(ts, v)| v.map(|value| Sample::new(*ts, value)))
            .collect())
    }

    /// Add (or replace) a channel; length must match the row count
    pub fn add_channel(&mut self, name: &str, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.timestamps.len());
        if let Some(slot) = self.channels.iter_mut().find(|(n, _)| n == name) {
            slot.1 = values;
        } else {
            self.channels.push((name.to_string(), values));
        }
    }

    /// Keep only rows where `keep` returns true for the row index
    pub fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.timestamps.len());
        let mut iter = keep.iter();
        self.timestamps.retain(|_| *iter.next().unwrap_or(&false));
        for (_, values) in &mut self.channels {
            let mut iter = keep.iter();
            values.retain(|_| *iter.next().unwrap_or(&false));
        }
    }

    /// Stable sort of all rows by timestamp (duplicates keep file order)
    pub fn sort_by_timestamp(&mut self) {
        let mut order: Vec<usize> = (0..self.timestamps.len()).collect();
        order.sort_by_key(|&i| self.timestamps[i]);
        if order.iter().enumerate().all(|(i, &j)| i == j) {
            return;
        }
        self.timestamps = order.iter().map(|&i| self.timestamps[i]).collect();
        for (_, values) in &mut self.channels {
            *values = order.iter().map(|&i| values[i]).collect();
        }
    }
}

/// Decode a Latin-1 byte stream
///
/// Latin-1 code points map one-to-one onto the first 256 Unicode scalars,
/// so the decode is a direct widening.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
