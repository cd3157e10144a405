//! Capture timestamps used as artifact identifiers
//!
//! Identifiers look like `YYYYMMDD_HHMMSS_ffffff` (UTC, microseconds), so
//! sorting them as strings matches sorting by capture time.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Last stamp handed out by this process, in microseconds since the epoch
static LAST_STAMP_MICROS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Next capture instant, strictly later than any previous one in this process
///
/// Two calls landing in the same microsecond get consecutive microseconds,
/// so identifiers derived from the result never collide within a process.
pub fn next_stamp() -> DateTime<Utc> {
    let now = Utc::now().timestamp_micros();
    let previous = LAST_STAMP_MICROS
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last.saturating_add(1)))
        })
        .unwrap_or(now);
    let micros = now.max(previous.saturating_add(1));

    DateTime::from_timestamp(
        micros.div_euclid(1_000_000),
        (micros.rem_euclid(1_000_000) * 1_000) as u32,
    )
    .unwrap_or_else(Utc::now)
}

/// Render a stamp as an identifier
pub fn format_stamp(stamp: &DateTime<Utc>) -> String {
    stamp.format("%Y%m%d_%H%M%S_%6f").to_string()
}

/// Parse an identifier produced by [`format_stamp`]
pub fn parse_stamp(value: &str) -> Option<DateTime<Utc>> {
    let parts: Vec<&str> = value.split('_').collect();
    if parts.len() != 3 {
        return None;
    }

    let (date_part, time_part, micros_part) = (parts[0], parts[1], parts[2]);
    if date_part.len() != 8 || time_part.len() != 6 || micros_part.len() != 6 {
        return None;
    }
    if !value.chars().all(|c| c.is_ascii_digit() || c == '_') {
        return None;
    }

    let year: i32 = date_part[0..4].parse().ok()?;
    let month: u32 = date_part[4..6].parse().ok()?;
    let day: u32 = date_part[6..8].parse().ok()?;
    let hour: u32 = time_part[0..2].parse().ok()?;
    let minute: u32 = time_part[2..4].parse().ok()?;
    let second: u32 = time_part[4..6].parse().ok()?;
    let micros: u32 = micros_part.parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_micro_opt(hour, minute, second, micros)?;

    Some(NaiveDateTime::new(date, time).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_stamps_strictly_increase() {
        let stamps: Vec<_> = (0..1000).map(|_| next_stamp()).collect();
        for pair in stamps.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_format_and_parse() {
        let stamp = parse_stamp("20251127_143022_000456").unwrap();
        assert_eq!(stamp.year(), 2025);
        assert_eq!(stamp.month(), 11);
        assert_eq!(stamp.day(), 27);
        assert_eq!(stamp.hour(), 14);
        assert_eq!(stamp.nanosecond(), 456_000);
        assert_eq!(format_stamp(&stamp), "20251127_143022_000456");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_stamp("20251127_143022").is_none());
        assert!(parse_stamp("20251327_143022_000000").is_none());
        assert!(parse_stamp("2025112a_143022_000000").is_none());
        assert!(parse_stamp("+0251127_143022_000000").is_none());
        assert!(parse_stamp("").is_none());
    }

    #[test]
    fn test_identifier_order_matches_time_order() {
        let a = next_stamp();
        let b = next_stamp();
        assert!(format_stamp(&a) < format_stamp(&b));
    }
}
