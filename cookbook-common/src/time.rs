//! Timestamp utilities
//!
//! Timestamps are stored as integer microseconds since the Unix epoch so that
//! SQL ordering matches chronological ordering.

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time in microseconds since the Unix epoch
pub fn now_micros() -> i64 {
    now().timestamp_micros()
}

/// Convert a stored microsecond value back to a UTC timestamp
///
/// Out-of-range values clamp to the epoch.
pub fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}
