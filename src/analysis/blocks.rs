//! Time-of-use block classification (Edemet convention)

use crate::core::TimeBlock;
use chrono::{Datelike, NaiveDateTime, Timelike};

/// Classify a timestamp into its time-of-use block
///
/// Range membership is tested on (hour, minute) only; seconds are ignored,
/// matching the utility's published rule. Weekdays: 09:00-17:00 peak,
/// 17:01-23:59 mid, the rest low. Saturday: 11:00-22:59 mid, the rest low.
/// Sunday: always low.
pub fn classify(timestamp: NaiveDateTime) -> TimeBlock {
    let hm = (timestamp.hour(), timestamp.minute());
    let in_range = |from: (u32, u32), to: (u32, u32)| hm >= from && hm <= to;

    match timestamp.weekday().num_days_from_monday() {
        0..=4 => {
            if in_range((9, 0), (17, 0)) {
                TimeBlock::Peak
            } else if in_range((17, 1), (23, 59)) {
                TimeBlock::OffPeakMid
            } else {
                TimeBlock::OffPeakLow
            }
        }
        5 => {
            if in_range((11, 0), (22, 59)) {
                TimeBlock::OffPeakMid
            } else {
                TimeBlock::OffPeakLow
            }
        }
        _ => TimeBlock::OffPeakLow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_weekday_blocks() {
        // 2024-01-08 is a Monday
        assert_eq!(classify(at(2024, 1, 8, 10, 0, 0)), TimeBlock::Peak);
        assert_eq!(classify(at(2024, 1, 8, 18, 0, 0)), TimeBlock::OffPeakMid);
        assert_eq!(classify(at(2024, 1, 8, 3, 0, 0)), TimeBlock::OffPeakLow);
        assert_eq!(classify(at(2024, 1, 8, 8, 59, 59)), TimeBlock::OffPeakLow);
        assert_eq!(classify(at(2024, 1, 8, 9, 0, 0)), TimeBlock::Peak);
        assert_eq!(classify(at(2024, 1, 8, 23, 59, 59)), TimeBlock::OffPeakMid);
    }

    #[test]
    fn test_saturday_blocks() {
        // 2024-01-13 is a Saturday
        assert_eq!(classify(at(2024, 1, 13, 12, 0, 0)), TimeBlock::OffPeakMid);
        assert_eq!(classify(at(2024, 1, 13, 10, 59, 0)), TimeBlock::OffPeakLow);
        assert_eq!(classify(at(2024, 1, 13, 23, 0, 0)), TimeBlock::OffPeakLow);
    }

    #[test]
    fn test_sunday_always_low() {
        // 2024-01-14 is a Sunday
        for hour in 0..24 {
            assert_eq!(
                classify(at(2024, 1, 14, hour, 30, 0)),
                TimeBlock::OffPeakLow
            );
        }
    }

    #[test]
    fn test_seconds_ignored_at_boundary() {
        // Membership is minute-granular: any second within 17:00 is still
        // inside the peak range on a weekday.
        assert_eq!(classify(at(2024, 1, 8, 17, 0, 30)), TimeBlock::Peak);
        assert_eq!(classify(at(2024, 1, 8, 17, 0, 59)), TimeBlock::Peak);
        assert_eq!(classify(at(2024, 1, 8, 17, 1, 0)), TimeBlock::OffPeakMid);
    }
}
