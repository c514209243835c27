//! Column projection and normalisation.
//!
//! Every required column is cast once per batch to a canonical Arrow type:
//! entity ids to `Utf8`, instants to UTC millisecond timestamps, coordinates
//! to `Float64`. Casts run in safe mode, so cells that cannot be converted
//! become nulls and the row is dropped by validation instead of failing the
//! batch.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Float64Array, StringArray, TimestampMillisecondArray};
use arrow::compute::{can_cast_types, cast};
use arrow::datatypes::{DataType, Float64Type, Schema, TimeUnit, TimestampMillisecondType};
use arrow::record_batch::RecordBatch;
use forecast_core::{ColumnNames, Error, RawRow, Result};

const UTC_OFFSET: &str = "+00:00";

fn utc_millis() -> DataType {
    DataType::Timestamp(TimeUnit::Millisecond, Some(Arc::from(UTC_OFFSET)))
}

/// Canonical type a column is converted to before rows are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    EntityId,
    Instant,
    Coordinate,
}

impl ColumnKind {
    fn target(self) -> DataType {
        match self {
            Self::EntityId => DataType::Utf8,
            Self::Instant => utc_millis(),
            Self::Coordinate => DataType::Float64,
        }
    }

    /// Whether a source type can be converted for this kind.
    fn accepts(self, source: &DataType) -> bool {
        match (self, source) {
            // Floating epoch values are truncated to integers first.
            (Self::Instant, t) if t.is_floating() => true,
            (_, t) => can_cast_types(t, &self.target()),
        }
    }

    fn convert(self, name: &str, column: &ArrayRef) -> Result<ArrayRef> {
        let source = column.data_type();
        if !self.accepts(source) {
            return Err(Error::unsupported_type(name, source));
        }

        let staged = match self {
            Self::Instant if source.is_floating() => cast(column, &DataType::Int64)
                .map_err(|e| Error::decode(format!("column {name}: {e}")))?,
            Self::EntityId if source.is_floating() => return float_ids(name, column),
            _ => column.clone(),
        };

        cast(&staged, &self.target()).map_err(|e| Error::decode(format!("column {name}: {e}")))
    }
}

/// Decimal text of a floating id; whole values carry no fractional part.
fn float_id(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    // -0.0 would otherwise render as "-0".
    Some(if value == 0.0 { "0".to_string() } else { value.to_string() })
}

fn float_ids(name: &str, column: &ArrayRef) -> Result<ArrayRef> {
    let widened = cast(column, &DataType::Float64)
        .map_err(|e| Error::decode(format!("column {name}: {e}")))?;
    let values = floats(name, widened)?;
    let ids: StringArray = values.iter().map(|v| v.and_then(float_id)).collect();
    Ok(Arc::new(ids))
}

fn kinds(names: &ColumnNames) -> [(&str, ColumnKind); 7] {
    [
        (names.entity_id.as_str(), ColumnKind::EntityId),
        (names.start_time.as_str(), ColumnKind::Instant),
        (names.forecast_time.as_str(), ColumnKind::Instant),
        (names.start_lat.as_str(), ColumnKind::Coordinate),
        (names.start_lon.as_str(), ColumnKind::Coordinate),
        (names.forecast_lat.as_str(), ColumnKind::Coordinate),
        (names.forecast_lon.as_str(), ColumnKind::Coordinate),
    ]
}

/// Check that a schema carries every required column with a readable type.
///
/// Missing columns are reported together; type problems are reported for the
/// first offending column.
pub fn check_schema(schema: &Schema, names: &ColumnNames) -> Result<()> {
    names.check(schema.fields().iter().map(|f| f.name().as_str()))?;

    for (name, kind) in kinds(names) {
        let field = schema
            .field_with_name(name)
            .map_err(|_| Error::missing_columns([name]))?;
        if !kind.accepts(field.data_type()) {
            return Err(Error::unsupported_type(name, field.data_type()));
        }
    }
    Ok(())
}

/// The seven required columns of one record batch, in canonical types.
#[derive(Debug, Clone)]
pub struct ProjectedBatch {
    entity_id: StringArray,
    start_time: TimestampMillisecondArray,
    forecast_time: TimestampMillisecondArray,
    start_lat: Float64Array,
    start_lon: Float64Array,
    forecast_lat: Float64Array,
    forecast_lon: Float64Array,
}

fn column<'b>(batch: &'b RecordBatch, name: &str) -> Result<&'b ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| Error::missing_columns([name]))
}

fn strings(name: &str, array: ArrayRef) -> Result<StringArray> {
    array
        .as_string_opt::<i32>()
        .cloned()
        .ok_or_else(|| Error::internal(format!("column {name} did not cast to Utf8")))
}

fn instants(name: &str, array: ArrayRef) -> Result<TimestampMillisecondArray> {
    array
        .as_primitive_opt::<TimestampMillisecondType>()
        .cloned()
        .ok_or_else(|| Error::internal(format!("column {name} did not cast to Timestamp(ms)")))
}

fn floats(name: &str, array: ArrayRef) -> Result<Float64Array> {
    array
        .as_primitive_opt::<Float64Type>()
        .cloned()
        .ok_or_else(|| Error::internal(format!("column {name} did not cast to Float64")))
}

impl ProjectedBatch {
    /// Project and convert the required columns of `batch`.
    pub fn project(batch: &RecordBatch, names: &ColumnNames) -> Result<Self> {
        let convert = |name: &str, kind: ColumnKind| kind.convert(name, column(batch, name)?);

        Ok(Self {
            entity_id: strings(
                &names.entity_id,
                convert(&names.entity_id, ColumnKind::EntityId)?,
            )?,
            start_time: instants(
                &names.start_time,
                convert(&names.start_time, ColumnKind::Instant)?,
            )?,
            forecast_time: instants(
                &names.forecast_time,
                convert(&names.forecast_time, ColumnKind::Instant)?,
            )?,
            start_lat: floats(
                &names.start_lat,
                convert(&names.start_lat, ColumnKind::Coordinate)?,
            )?,
            start_lon: floats(
                &names.start_lon,
                convert(&names.start_lon, ColumnKind::Coordinate)?,
            )?,
            forecast_lat: floats(
                &names.forecast_lat,
                convert(&names.forecast_lat, ColumnKind::Coordinate)?,
            )?,
            forecast_lon: floats(
                &names.forecast_lon,
                convert(&names.forecast_lon, ColumnKind::Coordinate)?,
            )?,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.entity_id.len()
    }

    /// Read row `i` as raw, unvalidated values. Nulls become `None`.
    pub fn row(&self, i: usize) -> RawRow<'_> {
        RawRow {
            entity_id: self.entity_id.is_valid(i).then(|| self.entity_id.value(i)),
            start_time: self.start_time.is_valid(i).then(|| self.start_time.value(i)),
            forecast_time: self
                .forecast_time
                .is_valid(i)
                .then(|| self.forecast_time.value(i)),
            start_lat: self.start_lat.is_valid(i).then(|| self.start_lat.value(i)),
            start_lon: self.start_lon.is_valid(i).then(|| self.start_lon.value(i)),
            forecast_lat: self.forecast_lat.is_valid(i).then(|| self.forecast_lat.value(i)),
            forecast_lon: self.forecast_lon.is_valid(i).then(|| self.forecast_lon.value(i)),
        }
    }
}
