//! Required column schema for columnar input.

use serde::{Deserialize, Serialize};

use crate::error::{Error, InputErrorCode, Result};

/// Names of the seven columns every columnar input must carry.
///
/// Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNames {
    #[serde(default = "default_entity_id")]
    pub entity_id: String,
    #[serde(default = "default_start_time")]
    pub start_time: String,
    #[serde(default = "default_forecast_time")]
    pub forecast_time: String,
    #[serde(default = "default_start_lat")]
    pub start_lat: String,
    #[serde(default = "default_start_lon")]
    pub start_lon: String,
    #[serde(default = "default_forecast_lat")]
    pub forecast_lat: String,
    #[serde(default = "default_forecast_lon")]
    pub forecast_lon: String,
}

fn default_entity_id() -> String {
    "duck_id".to_string()
}

fn default_start_time() -> String {
    "base_timestamp".to_string()
}

fn default_forecast_time() -> String {
    "forecast_timestamp".to_string()
}

fn default_start_lat() -> String {
    "start_lat".to_string()
}

fn default_start_lon() -> String {
    "start_lon".to_string()
}

fn default_forecast_lat() -> String {
    "forecast_lat".to_string()
}

fn default_forecast_lon() -> String {
    "forecast_lon".to_string()
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            entity_id: default_entity_id(),
            start_time: default_start_time(),
            forecast_time: default_forecast_time(),
            start_lat: default_start_lat(),
            start_lon: default_start_lon(),
            forecast_lat: default_forecast_lat(),
            forecast_lon: default_forecast_lon(),
        }
    }
}

impl ColumnNames {
    /// All required names, in record field order.
    pub fn required(&self) -> [&str; 7] {
        [
            &self.entity_id,
            &self.start_time,
            &self.forecast_time,
            &self.start_lat,
            &self.start_lon,
            &self.forecast_lat,
            &self.forecast_lon,
        ]
    }

    /// Check a set of available column names, reporting every missing one.
    pub fn check<'a>(&self, available: impl IntoIterator<Item = &'a str> + Clone) -> Result<()> {
        let missing: Vec<&str> = self
            .required()
            .into_iter()
            .filter(|name| !available.clone().into_iter().any(|a| a == *name))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::missing_columns(missing))
        }
    }
}

/// Validates raw buffer size BEFORE decoding.
pub fn validate_buffer_size(raw_bytes: &[u8], limit: usize) -> Result<()> {
    if raw_bytes.len() > limit {
        return Err(Error::input(
            InputErrorCode::TooLarge,
            format!(
                "buffer {}KB exceeds {}KB limit",
                raw_bytes.len() / 1024,
                limit / 1024
            ),
        ));
    }
    Ok(())
}
