//! Messages exchanged with the data worker.
//!
//! One request in, exactly one output out. The output mirrors the shape the
//! map front-end consumes: `hours`, `binnedRows`, `byDuck`, and optional
//! `error` / `debug` strings.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, InputErrorCode, Result};
use crate::record::ForecastRecord;
use crate::time::EpochMillis;

/// Request posted to the worker.
///
/// `array_buffer` is the authoritative Arrow IPC form; `csv_text` is the
/// legacy positional CSV form. When both are set the buffer wins.
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    pub array_buffer: Option<Bytes>,
    pub csv_text: Option<String>,
}

impl IngestRequest {
    pub fn arrow(buffer: impl Into<Bytes>) -> Self {
        Self {
            array_buffer: Some(buffer.into()),
            csv_text: None,
        }
    }

    pub fn csv(text: impl Into<String>) -> Self {
        Self {
            array_buffer: None,
            csv_text: Some(text.into()),
        }
    }

    /// Resolve the request into the input the pipeline will decode.
    pub fn into_input(self) -> Result<IngestInput> {
        match (self.array_buffer, self.csv_text) {
            (Some(buffer), _) => Ok(IngestInput::ArrowIpc(buffer)),
            (None, Some(text)) => Ok(IngestInput::CsvText(text)),
            (None, None) => Err(Error::input(InputErrorCode::Missing, "No arrayBuffer")),
        }
    }
}

/// Decoded request payload, owned by the worker for the duration of a run.
#[derive(Debug, Clone)]
pub enum IngestInput {
    ArrowIpc(Bytes),
    CsvText(String),
}

impl IngestInput {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ArrowIpc(_) => "arrow_ipc",
            Self::CsvText(_) => "csv",
        }
    }

    /// Encoded size of the input in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::ArrowIpc(buffer) => buffer.len(),
            Self::CsvText(text) => text.len(),
        }
    }
}

/// Result message of one run.
///
/// `binned_rows` keys are decimal epoch-millisecond strings of the bucket
/// hour; `by_duck` keys are entity ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutput {
    pub hours: Vec<EpochMillis>,
    pub binned_rows: BTreeMap<String, Vec<ForecastRecord>>,
    pub by_duck: BTreeMap<String, Vec<ForecastRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}

impl IngestOutput {
    /// An error-bearing output with empty derived fields.
    pub fn failed(error: &Error, debug: Option<String>) -> Self {
        Self {
            error: Some(error.to_string()),
            debug,
            ..Self::default()
        }
    }

    /// Whether the run hit a fatal error, as opposed to an empty dataset.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Bucket key for an hour-aligned instant.
    pub fn bucket_key(hour: EpochMillis) -> String {
        hour.to_string()
    }

    /// Records bucketed under `hour`, if any.
    pub fn bucket(&self, hour: EpochMillis) -> Option<&[ForecastRecord]> {
        self.binned_rows
            .get(&Self::bucket_key(hour))
            .map(Vec::as_slice)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
