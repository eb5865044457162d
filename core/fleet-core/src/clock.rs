//! RFC 3339 helpers for timestamps that cross the FFI boundary as strings.

use chrono::{DateTime, SecondsFormat, Utc};

pub fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Seconds elapsed from `timestamp` to `now`; `None` if the timestamp is malformed.
pub fn age_secs(timestamp: &str, now: DateTime<Utc>) -> Option<i64> {
    parse_rfc3339(timestamp).map(|ts| now.signed_duration_since(ts).num_seconds())
}
