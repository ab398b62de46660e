//! Edemet rate schedule
//!
//! Published rates from 2025 onward, keyed by half-year period. The
//! schedule is an immutable value: build it once at startup (or load a
//! newer one from TOML) and pass it by reference into billing.

use crate::core::{Error, PerBlock, Result};
use serde::{Deserialize, Serialize};

/// Versioned rate schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffSchedule {
    pub periods: Vec<RatePeriod>,
}

impl TariffSchedule {
    /// Rates for one period, by key (e.g. "2025-JUL-DIC")
    pub fn period(&self, key: &str) -> Result<&RatePeriod> {
        self.periods
            .iter()
            .find(|p| p.key == key)
            .ok_or_else(|| Error::UnknownPeriod(key.to_string()))
    }

    pub fn period_keys(&self) -> impl Iterator<Item = &str> {
        self.periods.iter().map(|p| p.key.as_str())
    }

    /// The published 2025 schedule
    pub fn builtin() -> Self {
        Self {
            periods: vec![
                RatePeriod {
                    key: "2025-ENE-JUN".to_string(),
                    bts: BtsRates {
                        fixed_charge: 3.16,
                        energy_tier_1: 0.14718,
                        energy_tier_2: 0.20998,
                        energy_tier_3: 0.30851,
                        connection: 16.68,
                        pf_charge: 0.01895,
                    },
                    btsh: BtshRates {
                        fixed_charge: 3.07,
                        energy: PerBlock {
                            peak: 0.37708,
                            off_peak_mid: 0.18126,
                            off_peak_low: 0.10926,
                        },
                        connection: 16.68,
                        pf_charge: 0.01841,
                    },
                    btd: BtdRates {
                        fixed_charge: 5.68,
                        energy_tier_1: 0.13580,
                        energy_tier_2: 0.14176,
                        energy_tier_3: 0.15333,
                        energy_tier_4: 0.16469,
                        connection: 71.82,
                        pf_charge: 0.01712,
                        demand_charge: 18.31,
                    },
                    bth: BlockDemandRates {
                        fixed_charge: 5.69,
                        energy: PerBlock {
                            peak: 0.26465,
                            off_peak_mid: 0.14420,
                            off_peak_low: 0.08021,
                        },
                        connection: 71.82,
                        pf_charge: 0.02124,
                        demand_charge: PerBlock {
                            peak: 18.81,
                            off_peak_mid: 2.71,
                            off_peak_low: 2.71,
                        },
                    },
                    mtd: MtdRates {
                        fixed_charge: 14.32,
                        energy: 0.14445,
                        connection: 142.00,
                        pf_charge: 0.01712,
                        demand_charge: 20.38,
                    },
                    mth: BlockDemandRates {
                        fixed_charge: 14.38,
                        energy: PerBlock {
                            peak: 0.27184,
                            off_peak_mid: 0.15294,
                            off_peak_low: 0.08352,
                        },
                        connection: 142.00,
                        pf_charge: 0.02133,
                        demand_charge: PerBlock {
                            peak: 17.89,
                            off_peak_mid: 3.10,
                            off_peak_low: 3.10,
                        },
                    },
                },
                RatePeriod {
                    key: "2025-JUL-DIC".to_string(),
                    bts: BtsRates {
                        fixed_charge: 3.15,
                        energy_tier_1: 0.16170,
                        energy_tier_2: 0.23216,
                        energy_tier_3: 0.34471,
                        connection: 16.63,
                        pf_charge: 0.02137,
                    },
                    btsh: BtshRates {
                        fixed_charge: 3.05,
                        energy: PerBlock {
                            peak: 0.42650,
                            off_peak_mid: 0.20015,
                            off_peak_low: 0.11740,
                        },
                        connection: 16.63,
                        pf_charge: 0.02079,
                    },
                    btd: BtdRates {
                        fixed_charge: 5.64,
                        energy_tier_1: 0.15634,
                        energy_tier_2: 0.16309,
                        energy_tier_3: 0.17619,
                        energy_tier_4: 0.18905,
                        connection: 71.58,
                        pf_charge: 0.01920,
                        demand_charge: 18.62,
                    },
                    bth: BlockDemandRates {
                        fixed_charge: 5.65,
                        energy: PerBlock {
                            peak: 0.30933,
                            off_peak_mid: 0.16917,
                            off_peak_low: 0.09491,
                        },
                        connection: 71.58,
                        pf_charge: 0.02209,
                        demand_charge: PerBlock {
                            peak: 19.37,
                            off_peak_mid: 2.55,
                            off_peak_low: 2.55,
                        },
                    },
                    mtd: MtdRates {
                        fixed_charge: 14.23,
                        energy: 0.16591,
                        connection: 142.00,
                        pf_charge: 0.01920,
                        demand_charge: 20.86,
                    },
                    mth: BlockDemandRates {
                        fixed_charge: 14.29,
                        energy: PerBlock {
                            peak: 0.31767,
                            off_peak_mid: 0.17930,
                            off_peak_low: 0.09873,
                        },
                        connection: 142.00,
                        pf_charge: 0.02221,
                        demand_charge: PerBlock {
                            peak: 18.58,
                            off_peak_mid: 2.87,
                            off_peak_low: 2.87,
                        },
                    },
                },
            ],
        }
    }
}

/// Rates for one half-year period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatePeriod {
    pub key: String,
    pub bts: BtsRates,
    pub btsh: BtshRates,
    pub btd: BtdRates,
    pub bth: BlockDemandRates,
    pub mtd: MtdRates,
    pub mth: BlockDemandRates,
}

/// Low voltage, simple: residential tiered energy pricing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BtsRates {
    pub fixed_charge: f64,
    /// Up to 300 kWh
    pub energy_tier_1: f64,
    /// 301-750 kWh
    pub energy_tier_2: f64,
    /// Above 750 kWh
    pub energy_tier_3: f64,
    pub connection: f64,
    pub pf_charge: f64,
}

/// Low voltage, simple with time-of-use energy rates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BtshRates {
    pub fixed_charge: f64,
    pub energy: PerBlock<f64>,
    pub connection: f64,
    pub pf_charge: f64,
}

/// Low voltage with maximum-demand charge and tiered energy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BtdRates {
    pub fixed_charge: f64,
    /// Up to 10 000 kWh
    pub energy_tier_1: f64,
    /// 10 001-30 000 kWh
    pub energy_tier_2: f64,
    /// 30 001-50 000 kWh
    pub energy_tier_3: f64,
    /// Above 50 000 kWh
    pub energy_tier_4: f64,
    pub connection: f64,
    pub pf_charge: f64,
    /// Per kW of the overall maximum demand
    pub demand_charge: f64,
}

/// Time-of-use energy plus per-block demand charges (BTH and MTH)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDemandRates {
    pub fixed_charge: f64,
    pub energy: PerBlock<f64>,
    pub connection: f64,
    pub pf_charge: f64,
    pub demand_charge: PerBlock<f64>,
}

/// Medium voltage with flat energy rate and maximum-demand charge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MtdRates {
    pub fixed_charge: f64,
    pub energy: f64,
    pub connection: f64,
    pub pf_charge: f64,
    /// Per kW of the overall maximum demand
    pub demand_charge: f64,
}
