//! MeterWatch library
//!
//! Batch analysis of power-quality logger exports: time-of-use
//! classification, excursion/outage detection, demand smoothing, and
//! simulated billing under the Edemet tariff structures.

pub mod analysis;
pub mod core;
pub mod ingest;
pub mod preprocess;
pub mod report;
pub mod tariffs;
