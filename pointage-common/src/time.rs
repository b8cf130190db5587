//! Canonical timestamp handling
//!
//! All timestamps cross the store boundary as second-precision
//! `YYYY-MM-DD HH:MM:SS` strings. The dedupe key builder depends on this
//! exact rendering, so every write path must go through these helpers.

use chrono::{NaiveDate, NaiveDateTime, Timelike, Utc};

/// Second-precision timestamp format used in the database and dedupe keys
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Calendar day format
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Render a timestamp in the canonical store format
pub fn fmt_ts(ts: NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// Parse a canonical timestamp string; `None` on anything malformed
pub fn parse_ts(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TS_FORMAT).ok()
}

/// Render a calendar day
pub fn fmt_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Parse a calendar day string; `None` on anything malformed
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DAY_FORMAT).ok()
}

/// Current UTC time truncated to whole seconds
pub fn now_second_utc() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_canonical_format() {
        let ts = NaiveDate::from_ymd_opt(2025, 9, 16)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        let rendered = fmt_ts(ts);
        assert_eq!(rendered, "2025-09-16 08:30:00");
        assert_eq!(parse_ts(&rendered), Some(ts));
    }

    #[test]
    fn parse_tolerates_surrounding_whitespace() {
        assert!(parse_ts("  2025-09-16 08:30:00  ").is_some());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_ts("16/09/2025"), None);
        assert_eq!(parse_ts(""), None);
        assert_eq!(parse_day("not-a-day"), None);
    }

    #[test]
    fn now_has_no_subsecond_component() {
        assert_eq!(now_second_utc().nanosecond(), 0);
    }
}
