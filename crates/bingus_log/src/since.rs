//! Parsing of the `since` query boundary.

use crate::store::LogError;
use chrono::{DateTime, Days, Duration, Utc};

/// Parse a relative duration (`"24h"`, `"7d"`) or an RFC3339 timestamp into
/// an absolute cutoff. The empty string defaults to `"24h"`.
///
/// Days are subtracted as calendar days, hours as exact hours.
///
/// # Errors
///
/// Returns [`LogError::InvalidSince`] when the value matches neither form.
pub fn parse_since(since: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, LogError> {
    let since = if since.is_empty() { "24h" } else { since };

    let invalid = || LogError::InvalidSince {
        value: since.to_string(),
    };

    if let Some(days) = since.strip_suffix('d') {
        if let Ok(days) = days.parse::<u64>() {
            return now.checked_sub_days(Days::new(days)).ok_or_else(invalid);
        }
    }
    if let Some(hours) = since.strip_suffix('h') {
        if let Ok(hours) = hours.parse::<u32>() {
            return Ok(now - Duration::hours(i64::from(hours)));
        }
    }

    DateTime::parse_from_rfc3339(since)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_durations() {
        let now = Utc::now();
        let cases = [("24h", 24), ("1h", 1), ("", 24)];
        for (input, hours) in cases {
            let cutoff = parse_since(input, now).unwrap();
            assert_eq!(now - cutoff, Duration::hours(hours), "since={:?}", input);
        }
    }

    #[test]
    fn test_calendar_days() {
        let now = "2026-03-15T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let cutoff = parse_since("7d", now).unwrap();
        assert_eq!(cutoff, "2026-03-08T10:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_rfc3339() {
        let now = Utc::now();
        let cutoff = parse_since("2026-01-15T10:00:00Z", now).unwrap();
        assert_eq!(cutoff, "2026-01-15T10:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_rfc3339_with_offset() {
        let now = Utc::now();
        let cutoff = parse_since("2026-01-15T10:00:00+02:00", now).unwrap();
        assert_eq!(cutoff, "2026-01-15T08:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_invalid_values() {
        let now = Utc::now();
        for input in ["bogus", "d", "h", "-1d", "24x", "2026-13-99"] {
            let err = parse_since(input, now).unwrap_err();
            assert!(
                err.to_string().contains("invalid since value"),
                "since={:?} gave {}",
                input,
                err
            );
        }
    }
}
