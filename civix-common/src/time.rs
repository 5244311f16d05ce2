//! Timestamp utilities
//!
//! Timestamps are persisted as RFC 3339 strings with microsecond precision and a
//! `Z` suffix. That fixed-width form sorts lexicographically in time order, which
//! the `ORDER BY created_at` queries rely on.

use chrono::{DateTime, DurationRound, SecondsFormat, TimeDelta, Utc};

use crate::{Error, Result};

/// Current UTC timestamp, truncated to the stored (microsecond) precision
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(TimeDelta::microseconds(1)).unwrap_or(now)
}

/// Format a timestamp for storage
pub fn to_db_string(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub fn from_db_string(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("Invalid timestamp '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // After 2000-01-01, before 2100-01-01
        assert!(timestamp.timestamp() > 946_684_800);
        assert!(timestamp.timestamp() < 4_102_444_800);
    }

    #[test]
    fn test_now_survives_storage_unchanged() {
        let ts = now();
        assert_eq!(from_db_string(&to_db_string(&ts)).unwrap(), ts);
    }

    #[test]
    fn test_db_string_round_trip_keeps_microseconds() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap()
            + chrono::Duration::microseconds(123_456);
        let stored = to_db_string(&ts);
        assert_eq!(stored, "2024-05-17T09:30:00.123456Z");
        assert_eq!(from_db_string(&stored).unwrap(), ts);
    }

    #[test]
    fn test_db_strings_sort_in_time_order() {
        let earlier = Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap();
        let later = earlier + chrono::Duration::microseconds(1);
        assert!(to_db_string(&earlier) < to_db_string(&later));
    }

    #[test]
    fn test_from_db_string_rejects_garbage() {
        assert!(matches!(from_db_string("yesterday"), Err(Error::InvalidInput(_))));
    }
}
