//! Discarding results of superseded runs.

use std::sync::atomic::{AtomicU64, Ordering};

use forecast_core::IngestOutput;
use telemetry::metrics;
use tracing::debug;

/// Identifies one run issued by a [`RunGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RunToken(u64);

impl RunToken {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// Hands out run tokens; only the newest token's result is kept.
#[derive(Debug, Default)]
pub struct RunGuard {
    generation: AtomicU64,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run, superseding every earlier one.
    pub fn begin(&self) -> RunToken {
        RunToken(self.generation.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, token: RunToken) -> bool {
        self.generation.load(Ordering::Acquire) == token.0
    }

    /// Pass `output` through if `token` is still the newest run.
    pub fn accept(&self, token: RunToken, output: IngestOutput) -> Option<IngestOutput> {
        if self.is_current(token) {
            Some(output)
        } else {
            metrics().runs_superseded.inc();
            debug!(generation = token.0, "Discarded superseded run result");
            None
        }
    }
}
