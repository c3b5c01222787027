//! Timestamp utilities
//!
//! Inventory records carry their timestamp as free-form text. Ordering and
//! trend bucketing need an instant, so every accepted form is normalized to
//! `DateTime<Utc>` here. DynamoDB number attributes arrive as digit strings
//! and are read as epoch milliseconds. Text that matches none of the forms has no ordering
//! key; callers treat that as "earliest".

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Naive date-time layouts accepted in addition to RFC 3339 (interpreted as UTC)
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

/// Parse an inventory timestamp into an instant
///
/// Accepts epoch milliseconds (optionally signed integer text), RFC 3339,
/// naive `YYYY-MM-DD[T ]HH:MM[:SS[.fff]]` (UTC) and a bare `YYYY-MM-DD`
/// (midnight UTC). Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(millis) = epoch_millis(raw) {
        return DateTime::from_timestamp_millis(millis);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Integer text such as `1704067200000` or `-86400000`
fn epoch_millis(raw: &str) -> Option<i64> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// UTC calendar date (`YYYY-MM-DD`) of an instant, used as the trend bucket label
pub fn calendar_date(instant: &DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}

/// Display form used by the inventory table
///
/// Unparsable input is returned verbatim so the operator still sees what the
/// upstream sent.
pub fn format_display(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(instant) => instant.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::time::Duration;

    #[test]
    fn test_millis_to_duration_one_second() {
        let duration = millis_to_duration(1000);
        assert_eq!(duration, Duration::from_secs(1));
    }

    #[test]
    fn test_parse_rfc3339_utc() {
        let parsed = parse_timestamp("2024-01-02T03:04:05Z").unwrap();
        assert_eq!(parsed.year(), 2024);
        assert_eq!(parsed.day(), 2);
        assert_eq!(parsed.hour(), 3);
        assert_eq!(parsed.second(), 5);
    }

    #[test]
    fn test_parse_rfc3339_with_offset_normalizes_to_utc() {
        let parsed = parse_timestamp("2024-01-02T08:00:00+08:00").unwrap();
        assert_eq!(parsed, parse_timestamp("2024-01-02T00:00:00Z").unwrap());
    }

    #[test]
    fn test_parse_naive_space_separated() {
        let parsed = parse_timestamp("2024-05-06 07:08:09").unwrap();
        assert_eq!(parsed.month(), 5);
        assert_eq!(parsed.minute(), 8);
    }

    #[test]
    fn test_parse_naive_fractional_seconds() {
        assert!(parse_timestamp("2024-05-06T07:08:09.123456").is_some());
    }

    #[test]
    fn test_parse_bare_date_is_midnight() {
        let parsed = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(parsed.hour(), 0);
        assert_eq!(calendar_date(&parsed), "2024-03-01");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("   ").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-13-45").is_none());
    }

    #[test]
    fn test_format_display() {
        assert_eq!(format_display("2024-01-02T03:04:05Z"), "2024-01-02 03:04:05");
        assert_eq!(format_display("not a time"), "not a time");
    }

    #[test]
    fn test_parse_epoch_millis() {
        let parsed = parse_timestamp("1704067200000").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(calendar_date(&parsed), "2024-01-01");

        let parsed = parse_timestamp(" 1704153600123 ").unwrap();
        assert_eq!(parsed.timestamp_subsec_millis(), 123);
        assert_eq!(calendar_date(&parsed), "2024-01-02");

        assert_eq!(
            parse_timestamp("-86400000").map(|t| calendar_date(&t)),
            Some("1969-12-31".to_string())
        );
    }

    #[test]
    fn test_epoch_millis_orders_with_text_timestamps() {
        let numeric = parse_timestamp("1704067200000").unwrap();
        let text = parse_timestamp("2024-01-01T12:00:00Z").unwrap();
        assert!(numeric < text);
        assert_eq!(format_display("1704067200000"), "2024-01-01 00:00:00");
    }

    #[test]
    fn test_parse_rejects_malformed_numbers() {
        assert!(parse_timestamp("-").is_none());
        assert!(parse_timestamp("12a4").is_none());
        assert!(parse_timestamp("+1704067200000").is_none());
        assert!(parse_timestamp("99999999999999999999999").is_none());
    }
}
