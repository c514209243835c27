//! Records grouped by the hour their interval starts in.

use std::collections::BTreeMap;

use forecast_core::{floor_to_hour, EpochMillis, ForecastRecord};

/// Hour-aligned instant → records whose `start_time` floors to it, in
/// arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourBuckets {
    buckets: BTreeMap<EpochMillis, Vec<ForecastRecord>>,
}

impl HourBuckets {
    pub fn build(records: &[ForecastRecord]) -> Self {
        let mut buckets: BTreeMap<EpochMillis, Vec<ForecastRecord>> = BTreeMap::new();
        for record in records {
            buckets
                .entry(floor_to_hour(record.start_time))
                .or_default()
                .push(record.clone());
        }
        Self { buckets }
    }

    /// Records bucketed under an exact hour key.
    pub fn get(&self, hour: EpochMillis) -> Option<&[ForecastRecord]> {
        self.buckets.get(&hour).map(Vec::as_slice)
    }

    /// Records starting in the hour containing `instant`.
    pub fn at(&self, instant: EpochMillis) -> &[ForecastRecord] {
        self.get(floor_to_hour(instant)).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EpochMillis, &[ForecastRecord])> {
        self.buckets.iter().map(|(hour, rows)| (*hour, rows.as_slice()))
    }

    pub fn into_inner(self) -> BTreeMap<EpochMillis, Vec<ForecastRecord>> {
        self.buckets
    }
}
