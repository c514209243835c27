//! Per-entity record tracks.

use std::collections::BTreeMap;

use forecast_core::ForecastRecord;

/// Entity id → that entity's records sorted by `start_time`.
///
/// The sort is stable: records sharing a start time keep their source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityGroups {
    groups: BTreeMap<String, Vec<ForecastRecord>>,
}

impl EntityGroups {
    pub fn build(records: &[ForecastRecord]) -> Self {
        let mut groups: BTreeMap<String, Vec<ForecastRecord>> = BTreeMap::new();
        for record in records {
            groups
                .entry(record.entity_id.clone())
                .or_default()
                .push(record.clone());
        }

        for track in groups.values_mut() {
            track.sort_by_key(|r| r.start_time);
        }

        Self { groups }
    }

    /// The time-ordered track of one entity.
    pub fn track(&self, entity_id: &str) -> Option<&[ForecastRecord]> {
        self.groups.get(entity_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ForecastRecord])> {
        self.groups
            .iter()
            .map(|(id, track)| (id.as_str(), track.as_slice()))
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<ForecastRecord>> {
        self.groups
    }
}
