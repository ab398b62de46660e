//! Core module - Configuration, errors, and common types

mod config;
mod error;
mod types;

pub use config::{BillingConfig, ChannelsConfig, Config, DemandConfig, LimitsConfig};
pub use error::{Error, Result};
pub use types::{
    BlockMax, DemandPoint, ExcursionEvent, ExcursionKind, Extremum, PerBlock, Sample, TimeBlock,
};
