//! Millisecond timestamps as stored in the cache file.

use std::time::{SystemTime, UNIX_EPOCH};

/// Converts a [`SystemTime`] to milliseconds since the Unix epoch.
///
/// Times before the epoch collapse to 0, the same value used for entries
/// that could not be stat'd.
pub fn system_time_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Returns the current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    system_time_millis(SystemTime::now())
}
