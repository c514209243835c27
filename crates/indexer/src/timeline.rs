//! Dense hourly timeline spanning a record set.

use forecast_core::limits::{HOUR_MS, MAX_TIMELINE_HOURS};
use forecast_core::{floor_to_hour, EpochMillis, Error, ForecastRecord, Result};
use serde::Serialize;

/// Ascending hour-aligned instants from the floored earliest to the floored
/// latest instant of a record set, inclusive, one hour apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Timeline {
    hours: Vec<EpochMillis>,
}

impl Timeline {
    /// Build the timeline covering both start and forecast instants.
    ///
    /// Empty input yields an empty timeline.
    pub fn spanning(records: &[ForecastRecord]) -> Result<Self> {
        let bounds = records
            .iter()
            .flat_map(|r| [r.start_time, r.forecast_time])
            .fold(None, |acc: Option<(EpochMillis, EpochMillis)>, t| match acc {
                None => Some((t, t)),
                Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
            });

        match bounds {
            None => Ok(Self::default()),
            Some((min, max)) => Self::between(min, max),
        }
    }

    /// Hourly grid from `floor(min)` to `floor(max)` inclusive.
    pub fn between(min: EpochMillis, max: EpochMillis) -> Result<Self> {
        let first = floor_to_hour(min);
        let last = floor_to_hour(max);
        if last < first {
            return Ok(Self::default());
        }

        let steps = ((last - first) / HOUR_MS) as u64 + 1;
        if steps > MAX_TIMELINE_HOURS {
            return Err(Error::TimelineTooLong {
                hours: steps,
                limit: MAX_TIMELINE_HOURS,
            });
        }

        let hours = (0..steps as i64).map(|i| first + i * HOUR_MS).collect();
        Ok(Self { hours })
    }

    pub fn hours(&self) -> &[EpochMillis] {
        &self.hours
    }

    pub fn into_hours(self) -> Vec<EpochMillis> {
        self.hours
    }

    pub fn len(&self) -> usize {
        self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    pub fn first(&self) -> Option<EpochMillis> {
        self.hours.first().copied()
    }

    pub fn last(&self) -> Option<EpochMillis> {
        self.hours.last().copied()
    }

    /// Position of the hour containing `instant`, if it lies on the grid.
    pub fn index_of(&self, instant: EpochMillis) -> Option<usize> {
        let first = self.first()?;
        let hour = floor_to_hour(instant);
        if hour < first {
            return None;
        }
        let idx = ((hour - first) / HOUR_MS) as usize;
        (idx < self.hours.len()).then_some(idx)
    }
}
