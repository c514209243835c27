//! Unified error types for the forecast pipeline.
//!
//! Fatal errors abort a run and surface in the `error` field of the output
//! message. Error codes:
//! - SCHEMA_001-002: Column schema errors
//! - DECODE_001: Undecodable columnar buffer
//! - INPUT_001-002: Input message errors
//! - INDEX_001: Indexing errors
//! - WORKER_001: Worker lifecycle errors
//!
//! Rows that fail field validation are not errors; see
//! [`RowRejection`](crate::record::RowRejection).

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Schema error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// SCHEMA_001: One or more required columns are absent
    MissingColumns,
    /// SCHEMA_002: A required column has a type that cannot be read
    UnsupportedType,
}

impl SchemaErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingColumns => "SCHEMA_001",
            Self::UnsupportedType => "SCHEMA_002",
        }
    }
}

/// Input error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputErrorCode {
    /// INPUT_001: Message carried neither a buffer nor CSV text
    Missing,
    /// INPUT_002: Buffer exceeds the configured size limit
    TooLarge,
}

impl InputErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Missing => "INPUT_001",
            Self::TooLarge => "INPUT_002",
        }
    }
}

/// Unified error type for the forecast pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Required columns absent from the columnar input.
    #[error("[SCHEMA_001] missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// A required column exists but its type cannot be converted.
    #[error("[SCHEMA_002] column {column} has unsupported type {datatype}")]
    UnsupportedColumnType { column: String, datatype: String },

    /// The buffer could not be decoded as Arrow IPC.
    #[error("[DECODE_001] failed to decode columnar buffer: {0}")]
    Decode(String),

    /// Input message error with code.
    #[error("[{code}] {message}")]
    Input {
        code: &'static str,
        message: String,
    },

    /// The data spans more hours than the timeline may hold.
    #[error("[INDEX_001] timeline spans {hours} hours, exceeds {limit} hour limit")]
    TimelineTooLong { hours: u64, limit: u64 },

    /// The worker was torn down before it produced a result.
    #[error("[WORKER_001] worker unavailable: {0}")]
    WorkerUnavailable(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a schema error listing the missing columns.
    pub fn missing_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Schema {
            missing: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an unsupported column type error.
    pub fn unsupported_type(column: impl Into<String>, datatype: impl ToString) -> Self {
        Self::UnsupportedColumnType {
            column: column.into(),
            datatype: datatype.to_string(),
        }
    }

    pub fn decode(msg: impl ToString) -> Self {
        Self::Decode(msg.to_string())
    }

    /// Create an input error.
    pub fn input(code: InputErrorCode, msg: impl Into<String>) -> Self {
        Self::Input {
            code: code.code(),
            message: msg.into(),
        }
    }

    pub fn worker_unavailable(msg: impl Into<String>) -> Self {
        Self::WorkerUnavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Schema { .. } => Some(SchemaErrorCode::MissingColumns.code()),
            Self::UnsupportedColumnType { .. } => Some(SchemaErrorCode::UnsupportedType.code()),
            Self::Decode(_) => Some("DECODE_001"),
            Self::Input { code, .. } => Some(code),
            Self::TimelineTooLong { .. } => Some("INDEX_001"),
            Self::WorkerUnavailable(_) => Some("WORKER_001"),
            Self::Serialization(_) | Self::Internal(_) => None,
        }
    }
}
