//! Power-factor accumulation
//!
//! Derives the running power factor from cumulative reactive and active
//! energy, and the monthly (30-day-normalized) figure used by the
//! power-factor penalty in billing.

use crate::core::{ChannelsConfig, Result};
use crate::ingest::MeterFrame;

/// Cumulative power-factor channel added to the frame
pub const PF_CHANNEL: &str = "F.P. M";

/// Compute the cumulative power-factor series and the monthly figure
///
/// Rows missing either energy channel are removed from the frame (the
/// remaining pipeline operates on the filtered rows), the cumulative
/// series is added as [`PF_CHANNEL`], and the monthly power factor is
/// returned. Spans shorter than 30 days are scaled up to a full month;
/// a window with zero active energy yields an absent figure.
pub fn monthly_power_factor(
    frame: &mut MeterFrame,
    channels: &ChannelsConfig,
) -> Result<Option<f64>> {
    let reactive = frame.channel(&channels.reactive_energy)?.to_vec();
    let active = frame.channel(&channels.active_energy)?.to_vec();

    let keep: Vec<bool> = reactive
        .iter()
        .zip(&active)
        .map(|(r, a)| r.is_some() && a.is_some())
        .collect();
    frame.retain_rows(&keep);

    let reactive: Vec<f64> = frame
        .channel(&channels.reactive_energy)?
        .iter()
        .map(|v| v.unwrap_or(0.0))
        .collect();
    let active: Vec<f64> = frame
        .channel(&channels.active_energy)?
        .iter()
        .map(|v| v.unwrap_or(0.0))
        .collect();

    let mut cumulative = Vec::with_capacity(frame.len());
    let mut sum_kvarh = 0.0;
    let mut sum_kwh = 0.0;
    for (r, a) in reactive.iter().zip(&active) {
        sum_kvarh += r;
        sum_kwh += a;
        cumulative.push((sum_kwh != 0.0).then(|| (sum_kvarh / sum_kwh).atan().cos()));
    }
    frame.add_channel(PF_CHANNEL, cumulative);

    let span_days = match (frame.timestamps().first(), frame.timestamps().last()) {
        (Some(first), Some(last)) => (*last - *first).num_seconds() as f64 / 86_400.0,
        _ => 0.0,
    };
    let factor = if span_days > 0.0 && span_days < 30.0 {
        30.0 / span_days
    } else {
        1.0
    };

    let kvarh_month = sum_kvarh * factor;
    let kwh_month = sum_kwh * factor;
    Ok((kwh_month != 0.0).then(|| (kvarh_month / kwh_month).atan().cos()))
}
