//! Timestamp and unit conversion utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

/// Whole seconds to milliseconds (saturating)
pub fn secs_to_millis(secs: u64) -> u64 {
    secs.saturating_mul(1000)
}

/// Milliseconds to whole seconds, rounding down
pub fn millis_to_secs(millis: u64) -> u64 {
    millis / 1000
}
