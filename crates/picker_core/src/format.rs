//! Display helpers for pick timestamps.

use crate::model::roster::Timestamp;
use chrono::{Local, TimeZone, Utc};

const ABSOLUTE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats a timestamp as local wall time, or `"-"` when out of range.
pub fn format_time(timestamp: Timestamp) -> String {
    Local
        .timestamp_millis_opt(timestamp)
        .single()
        .map(|time| time.format(ABSOLUTE_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Coarse "time ago" label relative to the system clock.
pub fn relative(timestamp: Timestamp) -> String {
    relative_time(timestamp, Utc::now().timestamp_millis())
}

/// Coarse "time ago" label: seconds, minutes, hours, then days.
///
/// Timestamps in the future render as `0s ago`.
pub fn relative_time(timestamp: Timestamp, now: Timestamp) -> String {
    let seconds = now.saturating_sub(timestamp).max(0) / 1000;
    if seconds < 60 {
        return format!("{seconds}s ago");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    format!("{}d ago", hours / 24)
}
