//! Analysis engine
//!
//! Time-of-use classification, excursion/outage event detection, demand
//! smoothing, and energy/power-factor aggregation. Everything here is a
//! pure batch transformation over in-memory series.

pub mod blocks;
pub mod demand;
pub mod energy;
pub mod events;
pub mod power_factor;
