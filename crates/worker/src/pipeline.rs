//! One ingest-then-index run.
//!
//! A run moves `Pending → Parsed → Done` exactly once and always ends with an
//! [`IngestOutput`]; fatal errors land in its `error` field.

use std::time::Instant;

use forecast_core::limits::MAX_DEBUG_SAMPLE_CHARS;
use forecast_core::schema::validate_buffer_size;
use forecast_core::{Error, ForecastRecord, IngestInput, IngestOutput, IngestRequest, Result};
use indexer::ForecastIndex;
use ingestor::{Ingested, Ingestor};
use telemetry::metrics;
use tracing::{debug, info, warn};

use crate::WorkerConfig;

/// Progress of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    /// Input received, not yet decoded
    Pending,
    /// Rows validated, index not yet built
    Parsed,
    /// Output produced
    Done,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Parsed => "parsed",
            Self::Done => "done",
        }
    }
}

struct Run<'a> {
    config: &'a WorkerConfig,
    state: PipelineState,
    rows_loaded: usize,
}

impl<'a> Run<'a> {
    fn new(config: &'a WorkerConfig) -> Self {
        Self {
            config,
            state: PipelineState::Pending,
            rows_loaded: 0,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(next > self.state);
        debug!(from = self.state.as_str(), to = next.as_str(), "Run state");
        self.state = next;
    }

    fn ingest(&mut self, request: IngestRequest) -> Result<Ingested> {
        let input = request.into_input()?;
        debug!(input = input.kind(), bytes = input.size_bytes(), "Decoding input");
        if let IngestInput::ArrowIpc(buffer) = &input {
            validate_buffer_size(buffer, self.config.max_buffer_bytes)?;
        }

        let ingested = Ingestor::new(self.config.columns.clone()).ingest(&input)?;
        self.rows_loaded = ingested.records.len();

        let m = metrics();
        m.rows_read.inc_by(ingested.rows_read as u64);
        m.rows_accepted.inc_by(ingested.records.len() as u64);
        m.rows_dropped.inc_by(ingested.dropped.total() as u64);
        if ingested.dropped.total() > 0 {
            debug!(
                input = input.kind(),
                missing_entity = ingested.dropped.missing_entity,
                invalid_instant = ingested.dropped.invalid_instant,
                non_finite_coordinate = ingested.dropped.non_finite_coordinate,
                short_row = ingested.dropped.short_row,
                "Rows dropped"
            );
        }

        Ok(ingested)
    }

    fn execute(&mut self, request: IngestRequest) -> Result<IngestOutput> {
        let ingested = self.ingest(request)?;
        self.advance(PipelineState::Parsed);

        let index = ForecastIndex::build(&ingested.records)?;
        let debug = self
            .config
            .debug_sample
            .then(|| sample_debug(self.rows_loaded, ingested.records.first()));

        info!(
            rows = ingested.rows_read,
            accepted = ingested.records.len(),
            dropped = ingested.dropped.total(),
            hours = index.timeline.len(),
            buckets = index.buckets.len(),
            entities = index.groups.len(),
            "Run indexed"
        );

        Ok(into_output(index, debug))
    }
}

fn into_output(index: ForecastIndex, debug: Option<String>) -> IngestOutput {
    IngestOutput {
        hours: index.timeline.into_hours(),
        binned_rows: index
            .buckets
            .into_inner()
            .into_iter()
            .map(|(hour, rows)| (IngestOutput::bucket_key(hour), rows))
            .collect(),
        by_duck: index.groups.into_inner(),
        error: None,
        debug,
    }
}

/// `Rows loaded: N, Example row: {json}`, or just the count when there is
/// no row to show.
fn sample_debug(rows_loaded: usize, example: Option<&ForecastRecord>) -> String {
    let sample = example.and_then(|r| serde_json::to_string(r).ok());
    match sample {
        Some(json) => {
            let json: String = json.chars().take(MAX_DEBUG_SAMPLE_CHARS).collect();
            format!("Rows loaded: {rows_loaded}, Example row: {json}")
        }
        None => format!("Rows loaded: {rows_loaded}"),
    }
}

/// Execute one run to completion. Never fails.
pub fn run(request: IngestRequest, config: &WorkerConfig) -> IngestOutput {
    let started = Instant::now();
    let m = metrics();
    m.runs_started.inc();

    let mut run = Run::new(config);
    let result = run.execute(request);
    run.advance(PipelineState::Done);

    let elapsed_ms = started.elapsed().as_millis() as u64;
    m.run_latency_ms.observe(elapsed_ms);

    match result {
        Ok(output) => {
            m.runs_completed.inc();
            debug!(latency_ms = elapsed_ms, "Run completed");
            output
        }
        Err(e) => {
            m.runs_failed.inc();
            warn!(
                code = e.error_code().unwrap_or("UNCODED"),
                rows_loaded = run.rows_loaded,
                latency_ms = elapsed_ms,
                "Run failed: {}",
                e
            );
            let debug = config
                .debug_sample
                .then(|| format!("Rows loaded: {}", run.rows_loaded));
            IngestOutput::failed(&e, debug)
        }
    }
}

/// Output for a run that died without producing one.
pub fn aborted(reason: &str) -> IngestOutput {
    metrics().runs_failed.inc();
    IngestOutput::failed(&Error::internal(format!("run aborted: {reason}")), None)
}
