//! Forecast rows and Arrow IPC buffer builders.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMillisecondArray};
use arrow::ipc::writer::{FileWriter, StreamWriter};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat};

pub const HOUR_MS: i64 = 3_600_000;
pub const MINUTE_MS: i64 = 60_000;

/// 2024-01-01T00:00:00Z
pub const T0: i64 = 1_704_067_200_000;

/// Column names in the order the fixtures emit them.
pub const COLUMNS: [&str; 7] = [
    "duck_id",
    "base_timestamp",
    "forecast_timestamp",
    "start_lat",
    "start_lon",
    "forecast_lat",
    "forecast_lon",
];

/// Epoch milliseconds of an RFC 3339 instant.
pub fn iso(text: &str) -> i64 {
    DateTime::parse_from_rfc3339(text)
        .expect("fixture instant")
        .timestamp_millis()
}

/// One source row. `None` cells are written as nulls.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub entity_id: Option<String>,
    pub start_time: Option<i64>,
    pub forecast_time: Option<i64>,
    pub start_lat: f64,
    pub start_lon: f64,
    pub forecast_lat: f64,
    pub forecast_lon: f64,
}

impl Row {
    /// Row for entity `id` with placeholder coordinates.
    pub fn at(id: &str, start_time: i64, forecast_time: i64) -> Self {
        Self {
            entity_id: Some(id.to_string()),
            start_time: Some(start_time),
            forecast_time: Some(forecast_time),
            start_lat: 10.0,
            start_lon: 10.0,
            forecast_lat: 11.0,
            forecast_lon: 11.0,
        }
    }

    pub fn coords(mut self, start: (f64, f64), forecast: (f64, f64)) -> Self {
        self.start_lat = start.0;
        self.start_lon = start.1;
        self.forecast_lat = forecast.0;
        self.forecast_lon = forecast.1;
        self
    }

    pub fn start_lat(mut self, lat: f64) -> Self {
        self.start_lat = lat;
        self
    }

    pub fn no_entity(mut self) -> Self {
        self.entity_id = None;
        self
    }

    pub fn no_start(mut self) -> Self {
        self.start_time = None;
        self
    }

    /// Whether the pipeline should keep this row.
    pub fn is_valid(&self) -> bool {
        self.entity_id.as_deref().is_some_and(|id| !id.is_empty())
            && self.start_time.is_some()
            && self.forecast_time.is_some()
            && [self.start_lat, self.start_lon, self.forecast_lat, self.forecast_lon]
                .iter()
                .all(|c| c.is_finite())
    }
}

/// How a batch encodes its columns.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    /// Instants as RFC 3339 text instead of timestamps
    pub text_instants: bool,
    /// Entity ids as Int64 instead of text
    pub int_ids: bool,
    /// Required column to leave out
    pub omit: Option<&'static str>,
    /// Append an unrelated column
    pub extra_column: bool,
    /// Rename the required columns, in [`COLUMNS`] order
    pub names: Option<[&'static str; 7]>,
}

fn text_instant(ms: Option<i64>) -> Option<String> {
    ms.and_then(DateTime::from_timestamp_millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn instant_column(rows: &[Row], layout: &Layout, pick: fn(&Row) -> Option<i64>) -> ArrayRef {
    if layout.text_instants {
        let text: Vec<Option<String>> = rows.iter().map(|r| text_instant(pick(r))).collect();
        Arc::new(StringArray::from(text))
    } else {
        let values: Vec<Option<i64>> = rows.iter().map(pick).collect();
        Arc::new(TimestampMillisecondArray::from(values).with_timezone("+00:00"))
    }
}

fn coordinate_column(rows: &[Row], pick: fn(&Row) -> f64) -> ArrayRef {
    Arc::new(Float64Array::from(rows.iter().map(pick).collect::<Vec<_>>()))
}

/// Build one record batch from `rows`.
pub fn record_batch(rows: &[Row], layout: &Layout) -> RecordBatch {
    let ids: ArrayRef = if layout.int_ids {
        let ids: Vec<Option<i64>> = rows
            .iter()
            .map(|r| r.entity_id.as_deref().and_then(|id| id.parse().ok()))
            .collect();
        Arc::new(Int64Array::from(ids))
    } else {
        let ids: Vec<Option<&str>> = rows.iter().map(|r| r.entity_id.as_deref()).collect();
        Arc::new(StringArray::from(ids))
    };

    let arrays: [ArrayRef; 7] = [
        ids,
        instant_column(rows, layout, |r| r.start_time),
        instant_column(rows, layout, |r| r.forecast_time),
        coordinate_column(rows, |r| r.start_lat),
        coordinate_column(rows, |r| r.start_lon),
        coordinate_column(rows, |r| r.forecast_lat),
        coordinate_column(rows, |r| r.forecast_lon),
    ];
    let names = layout.names.unwrap_or(COLUMNS);

    let mut columns: Vec<(&str, ArrayRef)> = names
        .into_iter()
        .zip(arrays)
        .filter(|(name, _)| Some(*name) != layout.omit)
        .collect();
    if layout.extra_column {
        let species: Vec<&str> = rows.iter().map(|_| "mallard").collect();
        columns.push(("species", Arc::new(StringArray::from(species))));
    }

    RecordBatch::try_from_iter(columns).expect("fixture batch")
}

/// Encode batches in the Arrow IPC stream format.
pub fn stream_buffer(batches: &[RecordBatch]) -> Bytes {
    let schema = batches[0].schema();
    let mut writer = StreamWriter::try_new(Vec::new(), &schema).expect("stream writer");
    for batch in batches {
        writer.write(batch).expect("write batch");
    }
    writer.finish().expect("finish stream");
    Bytes::from(writer.into_inner().expect("stream bytes"))
}

/// Encode batches in the Arrow IPC file format.
pub fn file_buffer(batches: &[RecordBatch]) -> Bytes {
    let schema = batches[0].schema();
    let mut writer = FileWriter::try_new(Vec::new(), &schema).expect("file writer");
    for batch in batches {
        writer.write(batch).expect("write batch");
    }
    writer.finish().expect("finish file");
    Bytes::from(writer.into_inner().expect("file bytes"))
}

/// Single-batch stream buffer in the default layout.
pub fn arrow_stream(rows: &[Row]) -> Bytes {
    stream_buffer(&[record_batch(rows, &Layout::default())])
}

/// A spread of valid rows over several entities and hours, out of order.
pub fn flock(n: usize) -> Vec<Row> {
    (0..n as i64)
        .map(|i| {
            let start = T0 + ((i * 37) % 53) * 17 * MINUTE_MS;
            let forecast = start + ((i % 7) - 2) * HOUR_MS;
            Row::at(&format!("duck-{}", i % 5), start, forecast)
                .coords((40.0 + i as f64 * 0.1, -90.0), (41.0, -90.0 - i as f64 * 0.1))
        })
        .collect()
}
