//! Forecast record type and row validation.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::time::{is_valid_instant, EpochMillis};

/// Rejects NaN and infinite coordinates.
fn validate_finite(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        let mut err = ValidationError::new("non_finite");
        err.message = Some(format!("coordinate {} is not finite", value).into());
        Err(err)
    }
}

/// Rejects instants that do not map to a calendar date.
fn validate_instant(value: &EpochMillis) -> Result<(), ValidationError> {
    if is_valid_instant(*value) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_instant"))
    }
}

/// One forecast interval: an entity's start position at `start_time` and its
/// predicted position at `forecast_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForecastRecord {
    /// Tracked individual (duck) identifier
    #[validate(length(min = 1))]
    pub entity_id: String,
    /// Interval start, epoch ms
    #[validate(custom(function = "validate_instant"))]
    pub start_time: EpochMillis,
    /// Forecast target, epoch ms
    #[validate(custom(function = "validate_instant"))]
    pub forecast_time: EpochMillis,
    #[validate(custom(function = "validate_finite"))]
    pub start_lat: f64,
    #[validate(custom(function = "validate_finite"))]
    pub start_lon: f64,
    #[validate(custom(function = "validate_finite"))]
    pub forecast_lat: f64,
    #[validate(custom(function = "validate_finite"))]
    pub forecast_lon: f64,
}

/// Why a row was dropped during ingestion.
///
/// Dropping is silent for the caller; the reasons only feed logs, metrics
/// and the debug diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowRejection {
    /// Entity id null or empty.
    MissingEntity,
    /// Start or forecast instant null, unparseable or out of range.
    InvalidInstant,
    /// A coordinate null, unparseable or not finite.
    NonFiniteCoordinate,
}

impl RowRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingEntity => "missing_entity",
            Self::InvalidInstant => "invalid_instant",
            Self::NonFiniteCoordinate => "non_finite_coordinate",
        }
    }

    fn from_errors(errors: &ValidationErrors) -> Self {
        let fields = errors.field_errors();
        if fields.contains_key("entity_id") {
            Self::MissingEntity
        } else if fields.contains_key("start_time") || fields.contains_key("forecast_time") {
            Self::InvalidInstant
        } else {
            Self::NonFiniteCoordinate
        }
    }
}

/// A row as read from the source, before validation.
///
/// `None` means the cell was null or could not be converted at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow<'a> {
    pub entity_id: Option<&'a str>,
    pub start_time: Option<EpochMillis>,
    pub forecast_time: Option<EpochMillis>,
    pub start_lat: Option<f64>,
    pub start_lon: Option<f64>,
    pub forecast_lat: Option<f64>,
    pub forecast_lon: Option<f64>,
}

impl ForecastRecord {
    /// Build a validated record from a raw row.
    ///
    /// Fields are never repaired: a row failing any invariant is rejected.
    pub fn from_raw(raw: &RawRow<'_>) -> Result<Self, RowRejection> {
        let entity_id = raw
            .entity_id
            .filter(|id| !id.is_empty())
            .ok_or(RowRejection::MissingEntity)?;

        let (Some(start_time), Some(forecast_time)) = (raw.start_time, raw.forecast_time) else {
            return Err(RowRejection::InvalidInstant);
        };

        let (Some(start_lat), Some(start_lon), Some(forecast_lat), Some(forecast_lon)) = (
            raw.start_lat,
            raw.start_lon,
            raw.forecast_lat,
            raw.forecast_lon,
        ) else {
            return Err(RowRejection::NonFiniteCoordinate);
        };

        let record = Self {
            entity_id: entity_id.to_string(),
            start_time,
            forecast_time,
            start_lat,
            start_lon,
            forecast_lat,
            forecast_lon,
        };

        record
            .validate()
            .map_err(|e| RowRejection::from_errors(&e))?;

        Ok(record)
    }
}
