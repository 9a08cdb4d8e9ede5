//! Lenient timestamp parsing for model-supplied time text.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Naive layouts accepted after RFC 3339. Interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%MZ",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp string, returning `None` when it is not a valid instant.
///
/// Accepts RFC 3339 (with offset or `Z`) and a few offset-less ISO 8601
/// layouts, which are taken as UTC. Bare dates and free text are rejected.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Minute-truncated UTC bucket (`YYYY-MM-DDTHH:MM`), or `""` if unparseable.
pub fn minute_bucket(s: &str) -> String {
    parse_timestamp(s)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M").to_string())
        .unwrap_or_default()
}
