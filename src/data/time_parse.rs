//! Timestamp normalization for upstream feed payloads.
//!
//! The feed emits kickoff and clock timestamps in two shapes: full ISO-8601
//! with an explicit offset (or `Z`), and a bare `"YYYY-MM-DD HH:MM:SS"` with
//! no offset at all. The bare form is implicitly UTC upstream, so it is
//! always interpreted as UTC here — never as host-local time.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unparseable feed timestamp: {input}")]
pub struct TimeParseError {
    pub input: String,
}

/// Parse a feed timestamp into an absolute instant.
///
/// Accepted formats, tried in order:
/// 1. ISO-8601 / RFC 3339 with offset (`2024-03-01T19:30:00+02:00`, `...Z`)
/// 2. Naive `YYYY-MM-DD HH:MM:SS` (interpreted as UTC)
/// 3. Naive `YYYY-MM-DDTHH:MM:SS` (interpreted as UTC)
pub fn parse_feed_timestamp(raw: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(TimeParseError {
        input: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rfc3339_with_zulu() {
        let parsed = parse_feed_timestamp("2024-03-01T19:30:00Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 19, 30, 0).unwrap());
    }

    #[test]
    fn test_rfc3339_with_offset() {
        // 19:30 at +02:00 is 17:30 UTC.
        let parsed = parse_feed_timestamp("2024-03-01T19:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 17, 30, 0).unwrap());
    }

    #[test]
    fn test_naive_is_always_utc() {
        // The bare form must equal the same string with "Z" appended,
        // regardless of the host timezone.
        let naive = parse_feed_timestamp("2024-03-01 19:30:00").unwrap();
        let zulu = parse_feed_timestamp("2024-03-01T19:30:00Z").unwrap();
        assert_eq!(naive, zulu);
    }

    #[test]
    fn test_naive_with_t_separator() {
        let parsed = parse_feed_timestamp("2024-03-01T19:30:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 19, 30, 0).unwrap());
    }

    #[test]
    fn test_garbage_is_typed_error() {
        let err = parse_feed_timestamp("yesterday-ish").unwrap_err();
        assert_eq!(err.input, "yesterday-ish");
    }

    #[test]
    fn test_empty_is_error() {
        assert!(parse_feed_timestamp("").is_err());
    }
}
