//! Frame preprocessing
//!
//! Splits the raw logger export into main and harmonic channels, derives
//! the net power/energy channels the analysis works on, and builds
//! average-day profiles.

use crate::core::Result;
use crate::ingest::MeterFrame;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use std::collections::BTreeMap;

// Source channels from the logger. Import totals carry no suffix; export
// (generation) totals carry a trailing "-".
const P_ACTIVE: &str = "P.Activa III";
const P_ACTIVE_EXPORT: &str = "P.Activa III -";
const P_INDUCTIVE: &str = "P.Inductiva III";
const P_INDUCTIVE_EXPORT: &str = "P.Inductiva III -";
const P_CAPACITIVE: &str = "P.Capacitiva III";
const P_CAPACITIVE_EXPORT: &str = "P.Capacitiva III -";

// Derived channels.
const P_ACTIVE_NET: &str = "P.Activa III T";
const P_INDUCTIVE_NET: &str = "P.Inductiva III T";
const P_CAPACITIVE_NET: &str = "P.Capacitiva III T";
const P_REACTIVE_NET: &str = "P.Reactiva III T";
const P_APPARENT_NET: &str = "P.Aparente III T";
const E_REACTIVE_METER: &str = "E.Reactiva III M";
const POWER_RATIO: &str = "P/S";

/// 1-minute samples: kW → kWh per sample
const MINUTES_TO_HOURS: f64 = 1.0 / 60.0;

/// Split a raw frame into (main, harmonics)
///
/// Harmonic channels start with `Arm.` or contain `Fund.`. The main frame
/// additionally drops the logger's per-interval min/max columns.
pub fn split_harmonics(frame: &MeterFrame) -> (MeterFrame, MeterFrame) {
    let mut main = MeterFrame::new(frame.timestamps().to_vec());
    let mut harmonics = MeterFrame::new(frame.timestamps().to_vec());

    for (name, values) in frame.columns() {
        let is_harmonic = name.starts_with("Arm.") || name.contains("Fund.");
        let lower = name.to_lowercase();
        let is_min_max = lower.contains("mín") || lower.contains("máx");

        if is_harmonic {
            harmonics.add_channel(name, values.to_vec());
        } else if !is_min_max {
            main.add_channel(name, values.to_vec());
        }
    }
    (main, harmonics)
}

/// Derive the net power, energy and ratio channels used downstream
///
/// Net totals subtract exported (generation) readings from imported ones;
/// energies assume 1-minute sampling. Fails fast naming the first missing
/// source channel.
pub fn derive_power_channels(frame: &mut MeterFrame) -> Result<()> {
    let active = frame.channel(P_ACTIVE)?.to_vec();
    let active_export = frame.channel(P_ACTIVE_EXPORT)?.to_vec();
    let inductive = frame.channel(P_INDUCTIVE)?.to_vec();
    let inductive_export = frame.channel(P_INDUCTIVE_EXPORT)?.to_vec();
    let capacitive = frame.channel(P_CAPACITIVE)?.to_vec();
    let capacitive_export = frame.channel(P_CAPACITIVE_EXPORT)?.to_vec();

    let active_net = zip2(&active, &active_export, |a, b| a - b);
    let inductive_net = zip2(&inductive, &inductive_export, |a, b| a - b);
    let capacitive_net = zip2(&capacitive, &capacitive_export, |a, b| a - b);
    let reactive_net = zip2(&inductive_net, &capacitive_net, |a, b| a + b);
    let apparent_net = zip2(&active_net, &reactive_net, |p, q| (p * p + q * q).sqrt());

    // Reactive energy as the meter registers it: imported inductive plus
    // exported capacitive.
    let reactive_energy = zip2(&inductive, &capacitive_export, |i, c| {
        (i + c) * MINUTES_TO_HOURS
    });

    let ratio = zip2(&active_net, &apparent_net, |p, s| {
        if s == 0.0 {
            0.0
        } else {
            p / s
        }
    });

    frame.add_channel(E_REACTIVE_METER, reactive_energy);
    for (power, values) in [
        (P_ACTIVE_NET, &active_net),
        (P_REACTIVE_NET, &reactive_net),
        (P_APPARENT_NET, &apparent_net),
    ] {
        let energy_name = format!("E{}", &power[1..]);
        let energy = values
            .iter()
            .map(|v| v.map(|p| p * MINUTES_TO_HOURS))
            .collect();
        frame.add_channel(&energy_name, energy);
    }

    frame.add_channel(P_ACTIVE_NET, active_net);
    frame.add_channel(P_INDUCTIVE_NET, inductive_net);
    frame.add_channel(P_CAPACITIVE_NET, capacitive_net);
    frame.add_channel(P_REACTIVE_NET, reactive_net);
    frame.add_channel(P_APPARENT_NET, apparent_net);
    frame.add_channel(POWER_RATIO, ratio);
    Ok(())
}

/// Average every channel per minute-of-day, optionally over selected weekdays
///
/// The result carries synthetic timestamps on 1900-01-01, so downstream
/// demand smoothing applies to the profile unchanged.
pub fn daily_profile(frame: &MeterFrame, weekdays: Option<&[Weekday]>) -> MeterFrame {
    let mut buckets: BTreeMap<(u32, u32), Vec<usize>> = BTreeMap::new();
    for (row, ts) in frame.timestamps().iter().enumerate() {
        if let Some(days) = weekdays {
            if !days.contains(&ts.weekday()) {
                continue;
            }
        }
        buckets
            .entry((ts.hour(), ts.minute()))
            .or_default()
            .push(row);
    }

    let timestamps: Vec<NaiveDateTime> = buckets
        .keys()
        .map(|&(hour, minute)| profile_timestamp(hour, minute))
        .collect();
    let mut profile = MeterFrame::new(timestamps);

    for (name, values) in frame.columns() {
        let averaged = buckets
            .values()
            .map(|rows| {
                let mut sum = 0.0;
                let mut count = 0usize;
                for &row in rows {
                    if let Some(v) = values[row] {
                        sum += v;
                        count += 1;
                    }
                }
                (count > 0).then(|| sum / count as f64)
            })
            .collect();
        profile.add_channel(name, averaged);
    }
    profile
}

fn profile_timestamp(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1900, 1, 1)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .expect("valid minute-of-day")
}

fn zip2<F>(a: &[Option<f64>], b: &[Option<f64>], f: F) -> Vec<Option<f64>>
where
    F: Fn(f64, f64) -> f64,
{
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Some(f(*x, *y)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChannelsConfig, Error};

    fn frame_from(text: &str) -> MeterFrame {
        MeterFrame::from_csv(text, &ChannelsConfig::default()).unwrap()
    }

    #[test]
    fn test_split_harmonics() {
        let frame = frame_from(
            "Fecha/hora,Tensión L12,Arm. Tensión 3,THD Fund. L1,Tensión L12 máx\n\
             01/06/25 00:00:00,240.0,1.2,0.9,245.0\n",
        );
        let (main, harmonics) = split_harmonics(&frame);

        let main_names: Vec<&str> = main.channel_names().collect();
        assert_eq!(main_names, vec!["Tensión L12"]);

        let harmonic_names: Vec<&str> = harmonics.channel_names().collect();
        assert_eq!(harmonic_names, vec!["Arm. Tensión 3", "THD Fund. L1"]);
    }

    #[test]
    fn test_derive_power_channels() {
        let mut frame = frame_from(
            "Fecha/hora,P.Activa III,P.Activa III -,P.Inductiva III,P.Inductiva III -,P.Capacitiva III,P.Capacitiva III -\n\
             01/06/25 00:00:00,5.0,1.0,3.0,0.0,1.0,0.5\n",
        );
        derive_power_channels(&mut frame).unwrap();

        assert_eq!(frame.channel("P.Activa III T").unwrap()[0], Some(4.0));
        assert_eq!(frame.channel("P.Reactiva III T").unwrap()[0], Some(3.5));
        let apparent = frame.channel("P.Aparente III T").unwrap()[0].unwrap();
        assert!((apparent - (4.0_f64 * 4.0 + 3.5 * 3.5).sqrt()).abs() < 1e-12);

        // kWh per 1-minute sample
        let active_energy = frame.channel("E.Activa III T").unwrap()[0].unwrap();
        assert!((active_energy - 4.0 / 60.0).abs() < 1e-12);
        let reactive_energy = frame.channel("E.Reactiva III M").unwrap()[0].unwrap();
        assert!((reactive_energy - 3.5 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_derive_missing_channel_fails_fast() {
        let mut frame = frame_from("Fecha/hora,P.Activa III\n01/06/25 00:00:00,5.0\n");
        let err = derive_power_channels(&mut frame).unwrap_err();
        match err {
            Error::MissingChannel(name) => assert_eq!(name, "P.Activa III -"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_power_ratio_zero_apparent() {
        let mut frame = frame_from(
            "Fecha/hora,P.Activa III,P.Activa III -,P.Inductiva III,P.Inductiva III -,P.Capacitiva III,P.Capacitiva III -\n\
             01/06/25 00:00:00,0.0,0.0,0.0,0.0,0.0,0.0\n",
        );
        derive_power_channels(&mut frame).unwrap();
        assert_eq!(frame.channel("P/S").unwrap()[0], Some(0.0));
    }

    #[test]
    fn test_daily_profile_averages_by_minute() {
        // Two days, same minute-of-day
        let frame = frame_from(
            "Fecha/hora,P.Activa III\n\
             02/06/25 10:00:00,10.0\n\
             03/06/25 10:00:00,20.0\n\
             02/06/25 10:01:00,30.0\n",
        );
        let profile = daily_profile(&frame, None);
        assert_eq!(profile.len(), 2);

        let values = profile.channel("P.Activa III").unwrap();
        assert_eq!(values[0], Some(15.0));
        assert_eq!(values[1], Some(30.0));
        assert_eq!(profile.timestamps()[0], profile_timestamp(10, 0));
    }

    #[test]
    fn test_daily_profile_weekday_filter() {
        // 2025-06-02 is a Monday, 2025-06-07 a Saturday
        let frame = frame_from(
            "Fecha/hora,P.Activa III\n\
             02/06/25 10:00:00,10.0\n\
             07/06/25 10:00:00,50.0\n",
        );
        let profile = daily_profile(&frame, Some(&[Weekday::Sat]));
        assert_eq!(profile.len(), 1);
        assert_eq!(profile.channel("P.Activa III").unwrap()[0], Some(50.0));
    }
}
