//! Calendar-date helpers.
//!
//! Dates are local calendar days (`NaiveDate`); time of day never matters.

use chrono::{Days, Local, NaiveDate, TimeDelta};
use once_cell::sync::Lazy;
use regex::Regex;

const MILLIS_PER_DAY: i64 = 86_400_000;
const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid iso date regex"));

/// Current local calendar date (midnight-truncated).
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parses a strict `YYYY-MM-DD` string.
///
/// Returns `None` for other shapes and for impossible dates such as
/// `2024-02-30`.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    if !ISO_DATE_RE.is_match(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, ISO_DATE_FORMAT).ok()
}

pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// Calendar-day addition without business-day skipping.
pub fn add_days(date: NaiveDate, days: u32) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(u64::from(days)))
}

/// Signed day count from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    ceil_days(to.signed_duration_since(from))
}

/// Converts a duration to whole days, rounding fractional remainders up
/// (toward the later date).
pub fn ceil_days(delta: TimeDelta) -> i64 {
    let millis = delta.num_milliseconds();
    let whole = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) > 0 {
        whole + 1
    } else {
        whole
    }
}

#[cfg(test)]
mod tests {
    use super::{add_days, ceil_days, days_between, parse_iso_date};
    use chrono::{NaiveDate, TimeDelta};

    fn date(value: &str) -> NaiveDate {
        parse_iso_date(value).unwrap()
    }

    #[test]
    fn parse_rejects_wrong_shapes_and_impossible_dates() {
        assert!(parse_iso_date("2024-01-05").is_some());
        assert!(parse_iso_date("2024-1-05").is_none());
        assert!(parse_iso_date("05/01/2024").is_none());
        assert!(parse_iso_date("2024-02-30").is_none());
        assert!(parse_iso_date("2024-01-05T10:00").is_none());
        assert!(parse_iso_date("").is_none());
    }

    #[test]
    fn days_between_is_signed() {
        assert_eq!(days_between(date("2024-01-10"), date("2024-01-06")), -4);
        assert_eq!(days_between(date("2024-01-20"), date("2024-02-01")), 12);
        assert_eq!(days_between(date("2024-01-06"), date("2024-01-06")), 0);
    }

    #[test]
    fn fractional_days_round_toward_later_date() {
        assert_eq!(ceil_days(TimeDelta::hours(36)), 2);
        assert_eq!(ceil_days(TimeDelta::hours(-36)), -1);
        assert_eq!(ceil_days(TimeDelta::hours(24)), 1);
        assert_eq!(ceil_days(TimeDelta::hours(-1)), 0);
    }

    #[test]
    fn add_days_crosses_month_and_leap_day() {
        assert_eq!(add_days(date("2024-02-25"), 5), Some(date("2024-03-01")));
        assert_eq!(add_days(date("2023-12-28"), 10), Some(date("2024-01-07")));
    }
}
