//! Core types, row validation and wire messages for the forecast pipeline.

pub mod error;
pub mod limits;
pub mod message;
pub mod record;
pub mod schema;
pub mod time;

pub use error::{Error, Result};
pub use message::*;
pub use record::*;
pub use schema::ColumnNames;
pub use time::{floor_to_hour, EpochMillis};
