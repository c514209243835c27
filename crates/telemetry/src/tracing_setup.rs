//! Tracing setup for structured logging.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

fn default_filter() -> String {
    "info".to_string()
}

/// Tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    /// Log level filter (e.g., "info", "ingestor=debug,indexer=trace")
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Whether to output JSON format
    #[serde(default)]
    pub json: bool,
    /// Whether to include span events
    #[serde(default)]
    pub span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
            span_events: false,
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_span_events(mut self, span_events: bool) -> Self {
        self.span_events = span_events;
        self
    }

    /// Overlay `LOG_JSON` and `RUST_LOG` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("LOG_JSON") {
            self.json = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Ok(filter) = std::env::var("RUST_LOG") {
            self.filter = filter;
        }
        self
    }
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed, which embedders and test
/// harnesses may treat as non-fatal.
pub fn try_init_tracing(config: &TracingConfig) -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(default_filter()));

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json {
        let fmt_layer = fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_span_events(span_events)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    tracing::info!(filter = %config.filter, json = config.json, "Tracing initialized");
    Ok(())
}
