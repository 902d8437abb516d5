//! Timestamp utilities
//!
//! Rows store timestamps as RFC 3339 UTC text with fixed microsecond
//! precision, so string order equals chronological order.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage
pub fn to_db(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time, formatted for storage
pub fn now_db() -> String {
    to_db(now())
}

/// Parse a stored timestamp
pub fn from_db(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", value, e)))
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}
