//! Flyway: background ingestion and indexing of waterfowl migration
//! forecasts.
//!
//! Embedders call [`start`] once inside a tokio runtime and post
//! [`IngestRequest`]s to the returned handle.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use telemetry::{try_init_tracing, TracingConfig};
use worker::{DataWorker, DataWorkerHandle, WorkerConfig};

pub use forecast_core::{ForecastRecord, IngestOutput, IngestRequest};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracing: TracingConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Load configuration from defaults, `config/default.toml` and `FLYWAY__*`
/// environment variables, in increasing precedence.
pub fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("FLYWAY")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Load `.env` and configuration, install tracing and spawn the data worker.
///
/// Must be called from within a tokio runtime.
pub fn start() -> Result<DataWorkerHandle> {
    dotenvy::dotenv().ok();

    let config = load_config()?;
    start_with(config)
}

/// Install tracing and spawn the data worker with an explicit configuration.
pub fn start_with(config: Config) -> Result<DataWorkerHandle> {
    let tracing_config = config.tracing.clone().with_env_overrides();
    if let Err(e) = try_init_tracing(&tracing_config) {
        debug!("Tracing already initialized: {}", e);
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        queue_capacity = config.worker.queue_capacity,
        max_buffer_bytes = config.worker.max_buffer_bytes,
        entity_column = %config.worker.columns.entity_id,
        "Starting flyway data worker"
    );

    Ok(DataWorker::spawn(config.worker))
}
