//! Position interpolation along an entity track.

use forecast_core::{EpochMillis, ForecastRecord};
use serde::Serialize;

/// A geographic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    fn lerp(self, to: Position, fraction: f64) -> Position {
        Position {
            lat: self.lat + (to.lat - self.lat) * fraction,
            lon: self.lon + (to.lon - self.lon) * fraction,
        }
    }
}

fn start_of(r: &ForecastRecord) -> Position {
    Position {
        lat: r.start_lat,
        lon: r.start_lon,
    }
}

fn forecast_of(r: &ForecastRecord) -> Position {
    Position {
        lat: r.forecast_lat,
        lon: r.forecast_lon,
    }
}

fn fraction(from: EpochMillis, to: EpochMillis, at: EpochMillis) -> f64 {
    if to <= from {
        return 0.0;
    }
    (at - from) as f64 / (to - from) as f64
}

/// Interpolated position of an entity at `at`.
///
/// `track` must be sorted by `start_time` (as produced by
/// [`EntityGroups`](crate::EntityGroups)). The latest record starting at or
/// before `at` governs:
/// - within its `[start_time, forecast_time]` interval, the position moves
///   linearly from its start to its forecast position;
/// - past that interval, the position moves linearly towards the next
///   record's start position.
///
/// Returns `None` before the first record and after the last record's
/// forecast instant.
pub fn position_at(track: &[ForecastRecord], at: EpochMillis) -> Option<Position> {
    let idx = track.partition_point(|r| r.start_time <= at).checked_sub(1)?;
    let current = &track[idx];

    if at <= current.forecast_time {
        let f = fraction(current.start_time, current.forecast_time, at);
        return Some(start_of(current).lerp(forecast_of(current), f));
    }

    let next = track.get(idx + 1)?;
    let f = fraction(current.forecast_time, next.start_time, at);
    Some(forecast_of(current).lerp(start_of(next), f))
}
