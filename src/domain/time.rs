//! Instant parsing and formatting for stored documents.
//!
//! Stored instants are RFC 3339 strings. Older documents carry offsets other
//! than UTC (`+00:00`, `+02:00`) or a trailing `Z`; all of them are accepted
//! and normalized to UTC.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Parse a stored instant. Returns `None` for empty or unparseable input.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    // Offset-less timestamps are treated as UTC.
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format an instant the way it is persisted.
pub fn format_instant(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Whether `value` is set and strictly after `now`.
pub fn is_future(value: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    value.is_some_and(|v| v > now)
}
