//! Indexer: derives the hourly views over validated forecast records.

pub mod buckets;
pub mod groups;
pub mod timeline;
pub mod track;

pub use buckets::HourBuckets;
pub use groups::EntityGroups;
pub use timeline::Timeline;
pub use track::{position_at, Position};

use forecast_core::{EpochMillis, ForecastRecord, Result};
use tracing::debug;

/// Timeline, hour buckets and entity tracks of one record set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastIndex {
    pub timeline: Timeline,
    pub buckets: HourBuckets,
    pub groups: EntityGroups,
}

impl ForecastIndex {
    pub fn build(records: &[ForecastRecord]) -> Result<Self> {
        let timeline = Timeline::spanning(records)?;
        let buckets = HourBuckets::build(records);
        let groups = EntityGroups::build(records);

        debug!(
            records = records.len(),
            hours = timeline.len(),
            buckets = buckets.len(),
            entities = groups.len(),
            "Built forecast index"
        );

        Ok(Self {
            timeline,
            buckets,
            groups,
        })
    }

    /// Interpolated position of one entity at `at`.
    pub fn position_of(&self, entity_id: &str, at: EpochMillis) -> Option<Position> {
        position_at(self.groups.track(entity_id)?, at)
    }
}
