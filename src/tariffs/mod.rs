//! Billing engine
//!
//! Computes simulated monthly bills under each Edemet tariff structure
//! from block-bucketed consumption, maximum demand and the monthly power
//! factor. Charges reproduce the published formulae, including the
//! power-factor penalty below 0.9.

pub mod rates;

pub use rates::{
    BlockDemandRates, BtdRates, BtsRates, BtshRates, MtdRates, RatePeriod, TariffSchedule,
};

use crate::core::{Error, PerBlock, TimeBlock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tariff code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tariff {
    /// Low voltage, simple (tiered energy)
    Bts,
    /// Low voltage, simple, time-of-use
    Btsh,
    /// Low voltage with maximum-demand charge
    Btd,
    /// Low voltage, time-of-use with per-block demand charges
    Bth,
    /// Medium voltage with maximum-demand charge
    Mtd,
    /// Medium voltage, time-of-use with per-block demand charges
    Mth,
}

impl Tariff {
    pub const ALL: [Tariff; 6] = [
        Tariff::Bts,
        Tariff::Btsh,
        Tariff::Btd,
        Tariff::Bth,
        Tariff::Mtd,
        Tariff::Mth,
    ];

    /// Published code, as printed on bills
    pub fn code(&self) -> &'static str {
        match self {
            Tariff::Bts => "BTS",
            Tariff::Btsh => "BTSH",
            Tariff::Btd => "BTD",
            Tariff::Bth => "BTH",
            Tariff::Mtd => "MTD",
            Tariff::Mth => "MTH",
        }
    }
}

impl fmt::Display for Tariff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Tariff {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BTS" => Ok(Tariff::Bts),
            "BTSH" => Ok(Tariff::Btsh),
            "BTD" => Ok(Tariff::Btd),
            "BTH" => Ok(Tariff::Bth),
            "MTD" => Ok(Tariff::Mtd),
            "MTH" => Ok(Tariff::Mth),
            other => Err(Error::UnknownTariff(other.to_string())),
        }
    }
}

/// Aggregated quantities a bill is computed from
#[derive(Debug, Clone, Serialize)]
pub struct BillingInput {
    /// Monthly energy per block, kWh
    pub consumption: PerBlock<f64>,
    /// Monthly power factor; absent when it could not be measured
    pub power_factor: Option<f64>,
    /// Maximum demand per block, kW
    pub max_demand: PerBlock<f64>,
}

/// One simulated monthly bill
#[derive(Debug, Clone, Serialize)]
pub struct BillBreakdown {
    pub tariff: Tariff,
    pub energy_charge: f64,
    pub demand_charge: f64,
    pub pf_penalty: f64,
    pub total: f64,
}

impl RatePeriod {
    /// Compute the bill for one tariff
    pub fn bill(&self, tariff: Tariff, input: &BillingInput) -> BillBreakdown {
        let kwh = input.consumption.total();
        let (energy, demand, pf_charge) = match tariff {
            Tariff::Bts => (bts_energy(&self.bts, kwh), 0.0, self.bts.pf_charge),
            Tariff::Btsh => (
                block_energy(&self.btsh.energy, &input.consumption),
                0.0,
                self.btsh.pf_charge,
            ),
            Tariff::Btd => (
                btd_energy(&self.btd, kwh),
                input.max_demand.max() * self.btd.demand_charge,
                self.btd.pf_charge,
            ),
            Tariff::Bth => (
                block_energy(&self.bth.energy, &input.consumption),
                block_demand_charge(&self.bth.demand_charge, &input.max_demand),
                self.bth.pf_charge,
            ),
            Tariff::Mtd => (
                kwh * self.mtd.energy,
                input.max_demand.max() * self.mtd.demand_charge,
                self.mtd.pf_charge,
            ),
            Tariff::Mth => (
                block_energy(&self.mth.energy, &input.consumption),
                block_demand_charge(&self.mth.demand_charge, &input.max_demand),
                self.mth.pf_charge,
            ),
        };

        let energy_charge = round_cents(energy);
        let demand_charge = round_cents(demand);
        let pf_penalty = pf_penalty(pf_charge, kwh, input.power_factor);
        BillBreakdown {
            tariff,
            energy_charge,
            demand_charge,
            pf_penalty,
            total: energy_charge + demand_charge + pf_penalty,
        }
    }
}

/// Penalty applied when the monthly power factor drops below 0.9
///
/// An absent power factor cannot be penalized.
fn pf_penalty(pf_charge: f64, kwh: f64, power_factor: Option<f64>) -> f64 {
    let Some(pf) = power_factor else { return 0.0 };
    if pf >= 0.9 {
        return 0.0;
    }
    round_cents(2.0 * (0.9 - round_cents(pf)) * kwh * pf_charge)
}

/// BTS residential tiers, with the published breakpoints
fn bts_energy(rates: &BtsRates, kwh: f64) -> f64 {
    if kwh <= 300.0 {
        kwh * rates.energy_tier_1
    } else if kwh <= 750.0 {
        290.0 * rates.energy_tier_1 + (kwh - 290.0) * rates.energy_tier_2
    } else {
        290.0 * rates.energy_tier_1 + 450.0 * rates.energy_tier_2 + (kwh - 740.0) * rates.energy_tier_3
    }
}

/// BTD commercial tiers at 10/30/50 MWh
fn btd_energy(rates: &BtdRates, kwh: f64) -> f64 {
    if kwh <= 10_000.0 {
        kwh * rates.energy_tier_1
    } else if kwh <= 30_000.0 {
        10_000.0 * rates.energy_tier_1 + (kwh - 10_000.0) * rates.energy_tier_2
    } else if kwh <= 50_000.0 {
        10_000.0 * rates.energy_tier_1
            + 20_000.0 * rates.energy_tier_2
            + (kwh - 30_000.0) * rates.energy_tier_3
    } else {
        10_000.0 * rates.energy_tier_1
            + 20_000.0 * rates.energy_tier_2
            + 20_000.0 * rates.energy_tier_3
            + (kwh - 50_000.0) * rates.energy_tier_4
    }
}

fn block_energy(rates: &PerBlock<f64>, consumption: &PerBlock<f64>) -> f64 {
    TimeBlock::ALL
        .iter()
        .map(|&b| consumption.get(b) * rates.get(b))
        .sum()
}

/// Demand charge for the per-block tariffs: the peak block is billed at
/// its own rate; of the two off-peak blocks, the one with the higher
/// demand is billed at that block's rate (ties favor mid)
fn block_demand_charge(rates: &PerBlock<f64>, demand: &PerBlock<f64>) -> f64 {
    let off_peak_demand = demand.off_peak_mid.max(demand.off_peak_low);
    let off_peak_rate = if demand.off_peak_mid >= demand.off_peak_low {
        rates.off_peak_mid
    } else {
        rates.off_peak_low
    };
    demand.peak * rates.peak + off_peak_demand * off_peak_rate
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period() -> RatePeriod {
        TariffSchedule::builtin()
            .period("2025-JUL-DIC")
            .unwrap()
            .clone()
    }

    fn input(peak: f64, mid: f64, low: f64) -> BillingInput {
        BillingInput {
            consumption: PerBlock {
                peak,
                off_peak_mid: mid,
                off_peak_low: low,
            },
            power_factor: Some(0.95),
            max_demand: PerBlock {
                peak: 10.0,
                off_peak_mid: 8.0,
                off_peak_low: 6.0,
            },
        }
    }

    #[test]
    fn test_bts_tier_boundaries() {
        let p = period();
        let t = &p.bts;

        let small = p.bill(Tariff::Bts, &input(0.0, 0.0, 100.0));
        assert_eq!(small.energy_charge, round(100.0 * t.energy_tier_1));

        let mid = p.bill(Tariff::Bts, &input(0.0, 0.0, 400.0));
        assert_eq!(
            mid.energy_charge,
            round(290.0 * t.energy_tier_1 + 110.0 * t.energy_tier_2)
        );

        let large = p.bill(Tariff::Bts, &input(0.0, 0.0, 800.0));
        assert_eq!(
            large.energy_charge,
            round(290.0 * t.energy_tier_1 + 450.0 * t.energy_tier_2 + 60.0 * t.energy_tier_3)
        );
        assert_eq!(large.demand_charge, 0.0);
    }

    #[test]
    fn test_btsh_block_energy() {
        let p = period();
        let bill = p.bill(Tariff::Btsh, &input(100.0, 200.0, 300.0));
        let expected = 100.0 * p.btsh.energy.peak
            + 200.0 * p.btsh.energy.off_peak_mid
            + 300.0 * p.btsh.energy.off_peak_low;
        assert_eq!(bill.energy_charge, round(expected));
        assert_eq!(bill.demand_charge, 0.0);
    }

    #[test]
    fn test_btd_demand_uses_overall_maximum() {
        let p = period();
        let bill = p.bill(Tariff::Btd, &input(1000.0, 0.0, 0.0));
        assert_eq!(bill.demand_charge, round(10.0 * p.btd.demand_charge));
    }

    #[test]
    fn test_bth_off_peak_demand_selection() {
        let mut p = period();
        // Differentiate the off-peak demand rates to observe the choice
        p.bth.demand_charge.off_peak_mid = 3.0;
        p.bth.demand_charge.off_peak_low = 5.0;

        let mut billing = input(100.0, 100.0, 100.0);
        billing.max_demand = PerBlock {
            peak: 10.0,
            off_peak_mid: 4.0,
            off_peak_low: 9.0,
        };
        let bill = p.bill(Tariff::Bth, &billing);
        // Low block demand wins, billed at the low-block rate
        assert_eq!(
            bill.demand_charge,
            round(10.0 * p.bth.demand_charge.peak + 9.0 * 5.0)
        );

        // On a tie the mid rate applies
        billing.max_demand.off_peak_mid = 9.0;
        let bill = p.bill(Tariff::Bth, &billing);
        assert_eq!(
            bill.demand_charge,
            round(10.0 * p.bth.demand_charge.peak + 9.0 * 3.0)
        );
    }

    #[test]
    fn test_pf_penalty_threshold() {
        assert_eq!(pf_penalty(0.02, 1000.0, Some(0.9)), 0.0);
        assert_eq!(pf_penalty(0.02, 1000.0, Some(0.95)), 0.0);
        // 2 * (0.9 - 0.85) * 1000 * 0.02 = 2.00
        assert_eq!(pf_penalty(0.02, 1000.0, Some(0.85)), 2.0);
        // Unmeasurable power factor cannot be penalized
        assert_eq!(pf_penalty(0.02, 1000.0, None), 0.0);
    }

    #[test]
    fn test_total_is_sum_of_parts() {
        let p = period();
        let mut billing = input(100.0, 200.0, 300.0);
        billing.power_factor = Some(0.85);
        let bill = p.bill(Tariff::Mth, &billing);
        assert!(bill.pf_penalty > 0.0);
        assert_eq!(
            bill.total,
            bill.energy_charge + bill.demand_charge + bill.pf_penalty
        );
    }

    #[test]
    fn test_tariff_parsing() {
        assert_eq!("bts".parse::<Tariff>().unwrap(), Tariff::Bts);
        assert_eq!("MTH".parse::<Tariff>().unwrap(), Tariff::Mth);
        assert!("XYZ".parse::<Tariff>().is_err());
    }

    fn round(value: f64) -> f64 {
        (value * 100.0).round() / 100.0
    }
}
