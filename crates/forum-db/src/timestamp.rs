//! Timestamps are stored as Unix milliseconds (UTC).

use chrono::{DateTime, Utc};

pub fn now_millis() -> i64 {
	Utc::now().timestamp_millis()
}

/// Stored milliseconds back to a timestamp; out-of-range values clamp to the epoch
pub fn from_millis(millis: i64) -> DateTime<Utc> {
	DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
