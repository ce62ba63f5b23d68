//! Tolerant timestamp parsing for event log records.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Offset-less layout accepted as a last resort, interpreted as UTC.
const BARE_DATETIME: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse a record timestamp.
///
/// Accepted, in order of preference:
/// 1. RFC 3339 with fractional seconds and offset (`2025-01-01T10:00:00.123Z`)
/// 2. RFC 3339 without fractional seconds (`2025-01-01T10:00:00+02:00`)
/// 3. Bare date-time without offset, with or without fractional seconds
///    (`2025-01-01T10:00:00`, `2025-01-01T10:00:00.123`), taken as UTC
///
/// Empty or unparseable input yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    // parse_from_rfc3339 covers both the fractional and whole-second forms
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, BARE_DATETIME)
        .ok()
        .map(|naive| naive.and_utc())
}
