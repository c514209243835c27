//! Instant helpers: epoch-millisecond arithmetic and text parsing.
//!
//! Instants travel through the pipeline as `i64` milliseconds since the Unix
//! epoch (UTC). An instant is valid when chrono can represent it as a
//! calendar date.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::limits::HOUR_MS;

/// Milliseconds since 1970-01-01T00:00:00Z.
pub type EpochMillis = i64;

/// Truncate an instant down to the start of its containing clock hour.
///
/// Uses Euclidean division so pre-epoch instants floor downward too.
pub fn floor_to_hour(ms: EpochMillis) -> EpochMillis {
    ms.div_euclid(HOUR_MS) * HOUR_MS
}

/// Whether `ms` is representable as a calendar instant.
pub fn is_valid_instant(ms: EpochMillis) -> bool {
    DateTime::<Utc>::from_timestamp_millis(ms).is_some()
}

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse timestamp text into an instant.
///
/// Accepts RFC 3339 (any offset), naive date-times (read as UTC) and bare
/// dates (midnight UTC). Returns `None` for anything else.
pub fn parse_instant(text: &str) -> Option<EpochMillis> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}
