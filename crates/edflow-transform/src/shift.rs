//! Shift-day bucketing.
//!
//! An operational day starts at the configured shift start rather than at
//! midnight; timestamps before the start belong to the previous day.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use edflow_model::{NormalizedRecord, ShiftStart};

/// Shift day a timestamp belongs to.
pub fn shift_day(timestamp: NaiveDateTime, start: ShiftStart) -> NaiveDate {
    let minute_of_day = timestamp.hour() * 60 + timestamp.minute();
    let date = timestamp.date();
    if minute_of_day < start.minutes() {
        date - Duration::days(1)
    } else {
        date
    }
}

/// Formats a shift day as its `YYYY-MM-DD` key.
pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Shift-day key (`YYYY-MM-DD`) for a timestamp.
pub fn shift_day_key(timestamp: NaiveDateTime, start: ShiftStart) -> String {
    day_key(shift_day(timestamp, start))
}

/// Shift day of a record, keyed on arrival and falling back to discharge.
pub fn record_shift_day(record: &NormalizedRecord, start: ShiftStart) -> Option<NaiveDate> {
    record
        .reference_time()
        .map(|reference| shift_day(reference, start))
}

/// Parses a `YYYY-MM-DD` key back into a date.
pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn before_start_belongs_to_previous_day() {
        let start = ShiftStart::from_hour(7);
        assert_eq!(shift_day_key(at(5, 3, 0), start), "2024-01-04");
        assert_eq!(shift_day_key(at(5, 6, 59), start), "2024-01-04");
        assert_eq!(shift_day_key(at(5, 7, 0), start), "2024-01-05");
        assert_eq!(shift_day_key(at(5, 23, 59), start), "2024-01-05");
    }

    #[test]
    fn midnight_start_is_calendar_day() {
        let start = ShiftStart::from_hour(0);
        assert_eq!(shift_day_key(at(1, 0, 0), start), "2024-01-01");
    }

    #[test]
    fn crosses_year_boundary() {
        let start = ShiftStart::default();
        assert_eq!(shift_day_key(at(1, 2, 30), start), "2023-12-31");
    }

    #[test]
    fn day_keys_round_trip() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(parse_day_key(&day_key(day)), Some(day));
        assert_eq!(parse_day_key("2024-13-01"), None);
    }

    proptest! {
        #[test]
        fn shift_day_is_same_or_previous_calendar_day(
            day in 1u32..=28,
            hour in 0u32..24,
            minute in 0u32..60,
            start_minutes in 0i64..1440,
        ) {
            let ts = at(day, hour, minute);
            let start = ShiftStart::from_minutes(start_minutes);
            let shifted = shift_day(ts, start);
            let diff = (ts.date() - shifted).num_days();
            prop_assert!(diff == 0 || diff == 1);
            prop_assert_eq!(diff == 1, hour * 60 + minute < start.minutes());
            prop_assert_eq!(shift_day(ts, start), shifted);
        }
    }
}
