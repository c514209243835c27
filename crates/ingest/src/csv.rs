//! Legacy positional CSV input.
//!
//! Each record is one row with fields read by position:
//!
//! | index | field |
//! |---|---|
//! | 0 | entity id |
//! | 1 | start time (text) |
//! | 2 | start lat |
//! | 3 | start lon |
//! | 4 | forecast time (text) |
//! | 5 | forecast lat |
//! | 6 | forecast lon |
//!
//! Records follow RFC 4180 quoting, so a quoted field may hold commas, line
//! breaks and doubled quotes. Rows shorter than [`MIN_FIELDS`] are skipped.
//! There is no header handling: a header line fails instant parsing and is
//! dropped like any invalid row.

use ::csv::{ReaderBuilder, StringRecord, Trim};
use forecast_core::time::parse_instant;
use forecast_core::RawRow;
use tracing::debug;

/// Minimum number of fields a line must carry to be considered a row.
pub const MIN_FIELDS: usize = 8;

/// Outcome of reading one CSV record.
#[derive(Debug, Clone, PartialEq)]
pub enum CsvLine<'a> {
    Row(RawRow<'a>),
    /// Fewer than [`MIN_FIELDS`] fields.
    Short,
    Blank,
}

fn number(field: Option<&str>) -> Option<f64> {
    field?.parse::<f64>().ok()
}

fn instant(field: Option<&str>) -> Option<i64> {
    parse_instant(field?)
}

/// Classify one parsed record.
pub fn classify(record: &StringRecord) -> CsvLine<'_> {
    if record.len() <= 1 && record.iter().all(str::is_empty) {
        return CsvLine::Blank;
    }
    if record.len() < MIN_FIELDS {
        return CsvLine::Short;
    }

    CsvLine::Row(RawRow {
        entity_id: record.get(0),
        start_time: instant(record.get(1)),
        start_lat: number(record.get(2)),
        start_lon: number(record.get(3)),
        forecast_time: instant(record.get(4)),
        forecast_lat: number(record.get(5)),
        forecast_lon: number(record.get(6)),
    })
}

/// Read every record of a CSV document, in order.
///
/// Records are parsed into one reused buffer, so each line is only valid
/// for the duration of its `visit` call. A record the reader cannot parse is
/// reported as [`CsvLine::Short`].
pub fn read_lines(text: &str, mut visit: impl FnMut(CsvLine<'_>)) {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());
    let mut record = StringRecord::new();

    loop {
        match reader.read_record(&mut record) {
            Ok(true) => visit(classify(&record)),
            Ok(false) => break,
            Err(e) => {
                debug!(error = %e, "Skipped unreadable CSV record");
                visit(CsvLine::Short);
            }
        }
    }
}
