//! Human-readable time formatting
//!
//! Chapter durations and playback positions are displayed as `M:SS`:
//! minutes unpadded, seconds always two digits. Negative input means the
//! duration is not known yet.

/// Placeholder shown when a duration is unknown
pub const DURATION_UNKNOWN: &str = "--:--";

/// Format milliseconds as `M:SS`
///
/// # Examples
///
/// ```
/// use chapter_common::human_time::format_mss;
///
/// assert_eq!(format_mss(0), "0:00");
/// assert_eq!(format_mss(90_000), "1:30");
/// assert_eq!(format_mss(264_000), "4:24");
/// assert_eq!(format_mss(-1), "--:--");
/// ```
pub fn format_mss(position_ms: i64) -> String {
    if position_ms < 0 {
        return DURATION_UNKNOWN.to_string();
    }

    let total_seconds = position_ms / 1000;
    let minutes = total_seconds / 60;
    let remaining_seconds = total_seconds - minutes * 60;
    format!("{}:{:02}", minutes, remaining_seconds)
}

/// Format whole seconds as `M:SS`
pub fn format_secs_mss(seconds: u64) -> String {
    format_mss(crate::time::secs_to_millis(seconds).min(i64::MAX as u64) as i64)
}
