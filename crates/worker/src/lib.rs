//! Data worker for the forecast pipeline.
//!
//! Hosts the ingest-then-index run behind a message-passing boundary:
//! - `pipeline`: a single run, request in and output out
//! - `data_worker`: the task that serves runs to async callers
//! - `supersede`: caller-side discarding of stale results

pub mod data_worker;
pub mod pipeline;
pub mod supersede;

pub use data_worker::{DataWorker, DataWorkerHandle};
pub use pipeline::{run, PipelineState};
pub use supersede::{RunGuard, RunToken};

use forecast_core::limits::DEFAULT_MAX_BUFFER_BYTES;
use forecast_core::ColumnNames;
use serde::{Deserialize, Serialize};

fn default_queue_capacity() -> usize {
    16
}

fn default_max_buffer_bytes() -> usize {
    DEFAULT_MAX_BUFFER_BYTES
}

fn default_debug_sample() -> bool {
    true
}

/// Data worker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Requests that may wait for the worker before `submit` applies
    /// backpressure
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub columns: ColumnNames,
    /// Largest accepted columnar buffer, in bytes
    #[serde(default = "default_max_buffer_bytes")]
    pub max_buffer_bytes: usize,
    /// Attach the `Rows loaded` diagnostic to outputs
    #[serde(default = "default_debug_sample")]
    pub debug_sample: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            columns: ColumnNames::default(),
            max_buffer_bytes: default_max_buffer_bytes(),
            debug_sample: default_debug_sample(),
        }
    }
}
