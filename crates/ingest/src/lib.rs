//! Ingestor: decodes forecast input into validated records.
//!
//! Accepts two encodings:
//! - Arrow IPC (stream or file format), columns matched by name
//! - Legacy positional CSV text
//!
//! Rows failing validation are dropped and counted; only schema and decode
//! problems fail a run.

pub mod columns;
pub mod csv;
pub mod ipc;

use bytes::Bytes;
use forecast_core::{ColumnNames, ForecastRecord, IngestInput, RawRow, Result, RowRejection};
use serde::Serialize;
use tracing::{debug, trace};

use crate::columns::{check_schema, ProjectedBatch};
use crate::csv::CsvLine;

/// Per-reason counts of rows dropped during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropCounts {
    pub missing_entity: usize,
    pub invalid_instant: usize,
    pub non_finite_coordinate: usize,
    /// CSV lines with too few fields
    pub short_row: usize,
}

impl DropCounts {
    pub fn record(&mut self, reason: RowRejection) {
        match reason {
            RowRejection::MissingEntity => self.missing_entity += 1,
            RowRejection::InvalidInstant => self.invalid_instant += 1,
            RowRejection::NonFiniteCoordinate => self.non_finite_coordinate += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.missing_entity + self.invalid_instant + self.non_finite_coordinate + self.short_row
    }
}

/// Validated rows of one input, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ingested {
    pub records: Vec<ForecastRecord>,
    /// Rows seen in the source, valid or not
    pub rows_read: usize,
    pub dropped: DropCounts,
}

impl Ingested {
    fn accept(&mut self, raw: &RawRow<'_>) {
        self.rows_read += 1;
        match ForecastRecord::from_raw(raw) {
            Ok(record) => self.records.push(record),
            Err(reason) => {
                trace!(row = self.rows_read - 1, reason = reason.as_str(), "Dropped row");
                self.dropped.record(reason);
            }
        }
    }
}

/// Decodes and validates forecast input.
#[derive(Debug, Clone, Default)]
pub struct Ingestor {
    columns: ColumnNames,
}

impl Ingestor {
    pub fn new(columns: ColumnNames) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &ColumnNames {
        &self.columns
    }

    /// Ingest either input encoding.
    pub fn ingest(&self, input: &IngestInput) -> Result<Ingested> {
        match input {
            IngestInput::ArrowIpc(buffer) => self.ingest_arrow(buffer),
            IngestInput::CsvText(text) => Ok(self.ingest_csv(text)),
        }
    }

    /// Decode an Arrow IPC buffer.
    ///
    /// The schema is checked before any row is read, so a missing column
    /// yields an error and no records.
    pub fn ingest_arrow(&self, buffer: &Bytes) -> Result<Ingested> {
        let reader = ipc::open(buffer)?;
        check_schema(&reader.schema(), &self.columns)?;

        let format = reader.format();
        let mut out = Ingested::default();
        let mut batches = 0usize;

        for batch in reader {
            let batch = batch?;
            let projected = ProjectedBatch::project(&batch, &self.columns)?;
            for i in 0..projected.num_rows() {
                out.accept(&projected.row(i));
            }
            batches += 1;
        }

        debug!(
            format = format.as_str(),
            batches = batches,
            rows_read = out.rows_read,
            accepted = out.records.len(),
            dropped = out.dropped.total(),
            "Decoded Arrow IPC buffer"
        );

        Ok(out)
    }

    /// Read legacy positional CSV. Never fails; unusable lines are skipped.
    pub fn ingest_csv(&self, text: &str) -> Ingested {
        let mut out = Ingested::default();

        crate::csv::read_lines(text, |line| match line {
            CsvLine::Row(raw) => out.accept(&raw),
            CsvLine::Short => out.dropped.short_row += 1,
            CsvLine::Blank => {}
        });

        debug!(
            rows_read = out.rows_read,
            accepted = out.records.len(),
            dropped = out.dropped.total(),
            "Parsed CSV text"
        );

        out
    }
}
