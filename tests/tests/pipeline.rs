//! End-to-end runs of the ingest and index pipeline over Arrow IPC buffers.

use std::collections::BTreeMap;

use forecast_core::{floor_to_hour, ColumnNames, IngestOutput, IngestRequest};
use integration_tests::fixtures::{
    self, arrow_stream, file_buffer, flock, iso, record_batch, stream_buffer, Layout, Row,
    COLUMNS, HOUR_MS, MINUTE_MS, T0,
};
use worker::{run, WorkerConfig};

fn run_stream(rows: &[Row]) -> IngestOutput {
    run(IngestRequest::arrow(arrow_stream(rows)), &WorkerConfig::default())
}

fn record_count(output: &IngestOutput) -> usize {
    output.by_duck.values().map(Vec::len).sum()
}

#[test]
fn test_single_row_example() {
    let row = Row::at(
        "7",
        iso("2024-01-01T00:10:00Z"),
        iso("2024-01-01T03:40:00Z"),
    )
    .coords((10.0, 10.0), (11.0, 11.0));
    let layout = Layout {
        text_instants: true,
        ..Layout::default()
    };
    let buffer = stream_buffer(&[record_batch(&[row], &layout)]);

    let output = run(IngestRequest::arrow(buffer), &WorkerConfig::default());

    assert!(output.error.is_none(), "unexpected error: {:?}", output.error);
    assert_eq!(
        output.hours,
        vec![
            iso("2024-01-01T00:00:00Z"),
            iso("2024-01-01T01:00:00Z"),
            iso("2024-01-01T02:00:00Z"),
            iso("2024-01-01T03:00:00Z"),
        ]
    );

    let bucket = output.bucket(T0).expect("bucket for 00:00");
    assert_eq!(bucket.len(), 1);
    assert_eq!(bucket[0].entity_id, "7");
    assert_eq!(bucket[0].start_time, T0 + 10 * MINUTE_MS);
    assert_eq!(output.binned_rows.len(), 1);

    assert_eq!(output.by_duck["7"], bucket.to_vec());
    assert!(output
        .debug
        .as_deref()
        .is_some_and(|d| d.starts_with("Rows loaded: 1, Example row: ")));
}

#[test]
fn test_nan_start_lat_is_dropped_silently() {
    let rows = vec![
        Row::at("7", T0, T0 + HOUR_MS).start_lat(f64::NAN),
        Row::at("8", T0, T0 + HOUR_MS),
    ];
    let output = run_stream(&rows);

    assert!(output.error.is_none());
    assert!(!output.by_duck.contains_key("7"));
    assert!(output
        .binned_rows
        .values()
        .flatten()
        .all(|r| r.entity_id != "7"));
    assert_eq!(record_count(&output), 1);
}

#[test]
fn test_validation_totality() {
    let rows = vec![
        Row::at("a", T0, T0 + HOUR_MS),
        Row::at("b", T0, T0 + HOUR_MS).no_entity(),
        Row::at("", T0, T0 + HOUR_MS),
        Row::at("c", T0, T0 + HOUR_MS).no_start(),
        Row::at("d", T0, T0 + HOUR_MS).coords((f64::INFINITY, 0.0), (0.0, 0.0)),
        Row::at("e", T0, T0 + HOUR_MS).coords((0.0, 0.0), (0.0, f64::NEG_INFINITY)),
        Row::at(" ", T0 + 2 * HOUR_MS, T0 + 3 * HOUR_MS),
        Row::at("f", T0 - HOUR_MS, T0 - 2 * HOUR_MS).coords((-90.0, -180.0), (90.0, 180.0)),
    ];
    let output = run_stream(&rows);

    let mut expected: Vec<&str> = rows
        .iter()
        .filter(|r| r.is_valid())
        .filter_map(|r| r.entity_id.as_deref())
        .collect();
    expected.sort_unstable();

    let mut kept: Vec<&str> = output
        .by_duck
        .values()
        .flatten()
        .map(|r| r.entity_id.as_str())
        .collect();
    kept.sort_unstable();

    assert_eq!(kept, expected);
    assert_eq!(kept, vec![" ", "a", "f"]);
}

#[test]
fn test_bucket_coverage() {
    let rows = flock(60);
    let output = run_stream(&rows);
    assert!(output.error.is_none());

    let total: usize = output.binned_rows.values().map(Vec::len).sum();
    assert_eq!(total, rows.len());

    for row in &rows {
        let start = row.start_time.unwrap();
        let hour = floor_to_hour(start);
        let key = IngestOutput::bucket_key(hour);
        for (bucket_key, records) in &output.binned_rows {
            let here = records
                .iter()
                .filter(|r| r.start_time == start && r.start_lat == row.start_lat)
                .count();
            if *bucket_key == key {
                assert_eq!(here, 1, "row starting {start} missing from bucket {key}");
            } else {
                assert_eq!(here, 0, "row starting {start} leaked into bucket {bucket_key}");
            }
        }
    }
}

#[test]
fn test_grouping_coverage_and_order() {
    let rows = flock(60);
    let output = run_stream(&rows);

    let mut expected: BTreeMap<&str, usize> = BTreeMap::new();
    for row in &rows {
        *expected.entry(row.entity_id.as_deref().unwrap()).or_default() += 1;
    }

    assert_eq!(output.by_duck.len(), expected.len());
    for (id, track) in &output.by_duck {
        assert_eq!(track.len(), expected[id.as_str()]);
        assert!(track.iter().all(|r| &r.entity_id == id));
        assert!(track.windows(2).all(|w| w[0].start_time <= w[1].start_time));
    }
}

#[test]
fn test_equal_start_times_keep_source_order() {
    let rows = vec![
        Row::at("7", T0 + HOUR_MS, T0 + 2 * HOUR_MS).start_lat(1.0),
        Row::at("7", T0, T0 + HOUR_MS).start_lat(2.0),
        Row::at("7", T0 + HOUR_MS, T0 + 2 * HOUR_MS).start_lat(3.0),
    ];
    let output = run_stream(&rows);
    let lats: Vec<f64> = output.by_duck["7"].iter().map(|r| r.start_lat).collect();
    assert_eq!(lats, vec![2.0, 1.0, 3.0]);
}

#[test]
fn test_timeline_bounds() {
    let rows = flock(60);
    let output = run_stream(&rows);

    let instants = rows
        .iter()
        .flat_map(|r| [r.start_time.unwrap(), r.forecast_time.unwrap()]);
    let min = instants.clone().min().unwrap();
    let max = instants.max().unwrap();

    assert_eq!(output.hours.first(), Some(&floor_to_hour(min)));
    assert_eq!(output.hours.last(), Some(&floor_to_hour(max)));
    assert!(output.hours.windows(2).all(|w| w[1] - w[0] == HOUR_MS));
    for key in output.binned_rows.keys() {
        let hour: i64 = key.parse().unwrap();
        assert!(output.hours.contains(&hour));
    }
}

#[test]
fn test_empty_input_gives_empty_result() {
    let output = run_stream(&[]);
    assert!(output.error.is_none());
    assert!(output.hours.is_empty());
    assert!(output.binned_rows.is_empty());
    assert!(output.by_duck.is_empty());

    let output = run_stream(&[Row::at("x", T0, T0).no_entity()]);
    assert!(output.error.is_none());
    assert!(output.hours.is_empty());
}

#[test]
fn test_missing_column_is_fatal() {
    for column in COLUMNS {
        let layout = Layout {
            omit: Some(column),
            ..Layout::default()
        };
        let buffer = stream_buffer(&[record_batch(&flock(5), &layout)]);
        let output = run(IngestRequest::arrow(buffer), &WorkerConfig::default());

        let error = output.error.as_deref().unwrap_or_default();
        assert!(error.contains("SCHEMA_001"), "{column}: {error}");
        assert!(error.contains(column), "{column}: {error}");
        assert!(output.hours.is_empty());
        assert!(output.binned_rows.is_empty());
        assert!(output.by_duck.is_empty());
        assert_eq!(output.debug.as_deref(), Some("Rows loaded: 0"));
    }
}

#[test]
fn test_undecodable_buffer_is_reported() {
    let output = run(
        IngestRequest::arrow(b"\x08\x00\x00\x00notarrow".to_vec()),
        &WorkerConfig::default(),
    );
    assert!(output.error.unwrap().contains("DECODE_001"));
    assert!(output.hours.is_empty());
}

fn overwrite_word(buffer: &[u8], at: usize, word: [u8; 8]) -> Vec<u8> {
    let mut bytes = buffer.to_vec();
    bytes[at..at + 8].copy_from_slice(&word);
    bytes
}

#[test]
fn test_corrupted_buffers_fail_with_a_code() {
    let batches = [
        record_batch(&flock(6), &Layout::default()),
        record_batch(&flock(9)[6..], &Layout::default()),
    ];
    let huge = (1u64 << 45).to_le_bytes();
    let config = WorkerConfig::default();

    for buffer in [stream_buffer(&batches), file_buffer(&batches)] {
        for at in (0..buffer.len() - 8).step_by(8) {
            let output = run(IngestRequest::arrow(overwrite_word(&buffer, at, huge)), &config);
            // Corrupt values may still decode; failures must carry a code.
            if let Some(error) = output.error {
                assert!(error.starts_with('['), "offset {at}: {error}");
            }
        }
    }
}

#[test]
fn test_truncated_batch_body_is_decode_error() {
    let buffer = arrow_stream(&flock(12));
    let cut = buffer.slice(..buffer.len() - 40);

    let output = run(IngestRequest::arrow(cut), &WorkerConfig::default());
    assert!(output.error.unwrap().starts_with("[DECODE_001]"));
    assert!(output.by_duck.is_empty());
}

#[test]
fn test_idempotent() {
    let buffer = file_buffer(&[
        record_batch(&flock(30), &Layout::default()),
        record_batch(&flock(45)[30..], &Layout::default()),
    ]);
    let config = WorkerConfig::default();

    let first = run(IngestRequest::arrow(buffer.clone()), &config);
    let second = run(IngestRequest::arrow(buffer), &config);

    assert!(first.error.is_none());
    assert_eq!(record_count(&first), 45);
    assert_eq!(first.hours, second.hours);
    assert_eq!(first.binned_rows, second.binned_rows);
    assert_eq!(first.by_duck, second.by_duck);
}

#[test]
fn test_stream_and_file_formats_agree() {
    let rows = flock(20);
    let batches = [record_batch(&rows, &Layout::default())];

    let config = WorkerConfig::default();
    let from_stream = run(IngestRequest::arrow(stream_buffer(&batches)), &config);
    let from_file = run(IngestRequest::arrow(file_buffer(&batches)), &config);

    assert_eq!(from_stream.hours, from_file.hours);
    assert_eq!(from_stream.by_duck, from_file.by_duck);
}

#[test]
fn test_integer_ids_become_strings() {
    let layout = Layout {
        int_ids: true,
        extra_column: true,
        ..Layout::default()
    };
    let rows = vec![
        Row::at("123", T0, T0 + HOUR_MS),
        Row::at("-9", T0, T0 + HOUR_MS),
    ];
    let buffer = stream_buffer(&[record_batch(&rows, &layout)]);
    let output = run(IngestRequest::arrow(buffer), &WorkerConfig::default());

    assert!(output.error.is_none());
    assert!(output.by_duck.contains_key("123"));
    assert!(output.by_duck.contains_key("-9"));
}

#[test]
fn test_unparseable_text_instants_are_dropped() {
    use arrow::array::{ArrayRef, Float64Array, StringArray};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    let text = |v: Vec<&str>| -> ArrayRef { Arc::new(StringArray::from(v)) };
    let float = |v: f64| -> ArrayRef { Arc::new(Float64Array::from(vec![v, v])) };
    let batch = RecordBatch::try_from_iter([
        ("duck_id", text(vec!["good", "bad"])),
        ("base_timestamp", text(vec!["2024-01-01T00:10:00Z", "yesterday"])),
        ("forecast_timestamp", text(vec!["2024-01-01T01:10:00Z", "2024-01-01T01:10:00Z"])),
        ("start_lat", float(1.0)),
        ("start_lon", float(2.0)),
        ("forecast_lat", float(3.0)),
        ("forecast_lon", float(4.0)),
    ])
    .unwrap();

    let output = run(
        IngestRequest::arrow(stream_buffer(&[batch])),
        &WorkerConfig::default(),
    );
    assert!(output.error.is_none());
    assert_eq!(output.by_duck.keys().collect::<Vec<_>>(), vec!["good"]);
}

#[test]
fn test_configured_column_names() {
    let names = ["bird", "t0", "t1", "lat0", "lon0", "lat1", "lon1"];
    let layout = Layout {
        names: Some(names),
        ..Layout::default()
    };
    let buffer = stream_buffer(&[record_batch(&fixtures::flock(10), &layout)]);

    let default_run = run(IngestRequest::arrow(buffer.clone()), &WorkerConfig::default());
    assert!(default_run.error.unwrap().contains("SCHEMA_001"));

    let config = WorkerConfig {
        columns: ColumnNames {
            entity_id: "bird".into(),
            start_time: "t0".into(),
            forecast_time: "t1".into(),
            start_lat: "lat0".into(),
            start_lon: "lon0".into(),
            forecast_lat: "lat1".into(),
            forecast_lon: "lon1".into(),
        },
        ..WorkerConfig::default()
    };
    let output = run(IngestRequest::arrow(buffer), &config);
    assert!(output.error.is_none());
    assert_eq!(record_count(&output), 10);
}

#[test]
fn test_output_serialises_with_wire_names() {
    let output = run_stream(&[Row::at("7", T0 + 10 * MINUTE_MS, T0 + HOUR_MS)]);
    let json: serde_json::Value = serde_json::from_str(&output.to_json().unwrap()).unwrap();

    assert_eq!(json["hours"][0], T0);
    let bucket = &json["binnedRows"][T0.to_string()];
    assert_eq!(bucket[0]["entityId"], "7");
    assert_eq!(json["byDuck"]["7"][0]["startTime"], T0 + 10 * MINUTE_MS);
    assert!(json.get("error").is_none());
}
