//! Logging setup and in-process metrics for the forecast pipeline.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::*;
pub use tracing_setup::*;
