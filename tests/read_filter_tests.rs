//! Ungrouped reads: one table per series, streamed from MemStore cursors.

mod common;

use common::*;
use tokio_util::sync::CancellationToken;
use tsread::prelude::*;
use tsread::storage::{RecordedRequest, StorageError};

fn labels(rows: &RowBatch) -> Vec<String> {
    rows.schema().labels().into_iter().map(str::to_string).collect()
}

#[tokio::test]
async fn single_series_becomes_one_table() {
    let store = MemStore::new();
    store.insert(series(&[("host", "a")], ints(&[(150, 42)])));

    let mut collector = TableCollector::new();
    let mut it = reader(&store).read_filter(
        &CancellationToken::new(),
        ReadFilterSpec::new(ORG, BUCKET),
        BOUNDS,
    );
    it.run(&mut collector).await.unwrap();

    let tables = collector.into_tables();
    assert_eq!(tables.len(), 1);
    let table = &tables[0];
    assert_eq!(table.key.labels(), vec!["_start", "_stop", "host"]);
    assert_eq!(table.key.value("host"), Some(&Scalar::Str("a".into())));
    assert_eq!(
        labels(&table.rows),
        vec!["_start", "_stop", "_time", "_value", "host"]
    );
    assert_eq!(table.rows.num_rows(), 1);
    assert_eq!(
        table.rows.row(0).unwrap(),
        vec![
            Scalar::Time(100),
            Scalar::Time(200),
            Scalar::Time(150),
            Scalar::I64(42),
            Scalar::Str("a".into()),
        ]
    );
    assert_eq!(it.statistics(), ScanStatistics::new(1, 8));
    assert_all_released(&store.ledger());
}

#[tokio::test]
async fn series_without_points_in_bounds_are_skipped() {
    let store = cpu_store();
    let mut collector = TableCollector::new();
    let mut it = reader(&store).read_filter(
        &CancellationToken::new(),
        ReadFilterSpec::new(ORG, BUCKET),
        BOUNDS,
    );
    it.run(&mut collector).await.unwrap();

    let hosts: Vec<String> = collector
        .tables()
        .iter()
        .flat_map(|t| str_column(&t.rows, "host").into_iter().take(1))
        .collect();
    assert_eq!(hosts, vec!["a", "b"]);

    // host b spans several cursor batches
    let b = &collector.tables()[1].rows;
    assert_eq!(b.num_rows(), 4);
    assert_eq!(
        b.column("_time").map(|c| c.values.clone()),
        Some(ColumnValues::Time(vec![110, 120, 130, 140]))
    );
    assert_eq!(it.statistics().scanned_values, 5);
    // a, b and c each had a cursor, plus the result set
    assert_eq!(store.ledger().opened(), 4);
    assert_all_released(&store.ledger());
}

#[tokio::test]
async fn predicate_selects_series() {
    let store = cpu_store();
    store.insert(series(
        &[("_measurement", "cpu"), ("host", "d"), ("region", "east")],
        ints(&[(160, 7)]),
    ));

    let mut collector = TableCollector::new();
    let spec = ReadFilterSpec::new(ORG, BUCKET).with_predicate("region == east".to_string());
    reader(&store)
        .read_filter(&CancellationToken::new(), spec, BOUNDS)
        .run(&mut collector)
        .await
        .unwrap();

    assert_eq!(collector.len(), 1);
    assert_eq!(str_column(&collector.tables()[0].rows, "host"), vec!["d"]);

    let requests = store.requests();
    let [RecordedRequest::ReadFilter(req)] = requests.as_slice() else {
        panic!("expected one read filter request");
    };
    assert!(req.predicate.is_some());
    assert_eq!((req.range.start, req.range.end), (100, 200));
    assert_all_released(&store.ledger());
}

#[tokio::test]
async fn each_value_type_keeps_its_column_type() {
    let store = MemStore::new();
    store.insert(series(&[("t", "float")], floats(&[(110, 0.5)])));
    store.insert(series(
        &[("t", "string")],
        SeriesData::String(vec![(120, "up".to_string())].into_iter().collect()),
    ));
    store.insert(series(
        &[("t", "unsigned")],
        SeriesData::Unsigned(vec![(130, 3u64)].into_iter().collect()),
    ));
    store.insert(series(
        &[("t", "bool")],
        SeriesData::Boolean(vec![(140, false)].into_iter().collect()),
    ));

    let mut collector = TableCollector::new();
    reader(&store)
        .read_filter(&CancellationToken::new(), ReadFilterSpec::new(ORG, BUCKET), BOUNDS)
        .run(&mut collector)
        .await
        .unwrap();

    let types: Vec<DataType> = collector
        .tables()
        .iter()
        .map(|t| t.rows.schema().columns[3].data_type)
        .collect();
    // tables come in tag order: bool, float, string, unsigned
    assert_eq!(
        types,
        vec![DataType::Boolean, DataType::Float64, DataType::Utf8, DataType::UInt64]
    );
    assert_all_released(&store.ledger());
}

#[tokio::test]
async fn series_without_a_cursor_is_skipped() {
    let store = MemStore::new();
    store.insert(series(&[("host", "nil")], SeriesData::Nil));
    store.insert(series(&[("host", "z")], ints(&[(150, 1)])));

    let mut collector = TableCollector::new();
    reader(&store)
        .read_filter(&CancellationToken::new(), ReadFilterSpec::new(ORG, BUCKET), BOUNDS)
        .run(&mut collector)
        .await
        .unwrap();

    assert_eq!(collector.len(), 1);
    assert_eq!(str_column(&collector.tables()[0].rows, "host"), vec!["z"]);
    assert_all_released(&store.ledger());
}

#[tokio::test]
async fn no_matching_series_completes_without_tables() {
    let store = cpu_store();
    let spec = ReadFilterSpec::new(ORG, BUCKET).with_predicate("host == nope".to_string());
    let mut collector = TableCollector::new();
    let mut it = reader(&store).read_filter(&CancellationToken::new(), spec, BOUNDS);
    it.run(&mut collector).await.unwrap();

    assert!(collector.is_empty());
    assert_eq!(it.statistics(), ScanStatistics::default());
    assert_eq!(store.ledger().opened(), 0);
}

#[tokio::test]
async fn other_bucket_is_invisible() {
    let store = cpu_store();
    let mut collector = TableCollector::new();
    reader(&store)
        .read_filter(
            &CancellationToken::new(),
            ReadFilterSpec::new(ORG, BucketId::new(10)),
            BOUNDS,
        )
        .run(&mut collector)
        .await
        .unwrap();
    assert!(collector.is_empty());
}

#[tokio::test]
async fn request_failure_is_returned() {
    let store = cpu_store();
    store.fail_requests("engine down");
    let mut collector = TableCollector::new();
    let err = reader(&store)
        .read_filter(&CancellationToken::new(), ReadFilterSpec::new(ORG, BUCKET), BOUNDS)
        .run(&mut collector)
        .await
        .unwrap_err();

    assert!(matches!(err, ReadError::Storage(StorageError::Engine(ref m)) if m == "engine down"));
    assert!(collector.is_empty());
    assert_eq!(store.ledger().opened(), 0);
}

#[tokio::test]
async fn result_set_error_is_reported_after_its_tables() {
    let store = cpu_store();
    store.fail_result_sets("index corrupt");
    let mut collector = TableCollector::new();
    let err = reader(&store)
        .read_filter(&CancellationToken::new(), ReadFilterSpec::new(ORG, BUCKET), BOUNDS)
        .run(&mut collector)
        .await
        .unwrap_err();

    assert!(matches!(err, ReadError::Storage(StorageError::Engine(ref m)) if m == "index corrupt"));
    assert_eq!(collector.len(), 2);
    assert_all_released(&store.ledger());
}

#[tokio::test]
async fn cursor_error_mid_stream_reaches_the_consumer() {
    let store = MemStore::new().with_batch_size(1);
    store.insert(
        series(&[("host", "a")], ints(&[(110, 1), (120, 2)])).with_cursor_error("bad block"),
    );

    let mut collector = TableCollector::new();
    let err = reader(&store)
        .read_filter(&CancellationToken::new(), ReadFilterSpec::new(ORG, BUCKET), BOUNDS)
        .run(&mut collector)
        .await
        .unwrap_err();

    assert!(matches!(err, ReadError::Storage(StorageError::Cursor(ref m)) if m == "bad block"));
    assert!(collector.is_empty());
    assert_all_released(&store.ledger());
}

#[tokio::test]
async fn cursor_error_on_first_read_fails_the_call() {
    let store = MemStore::new();
    store.insert(series(&[("host", "a")], ints(&[])).with_cursor_error("unreadable"));

    let mut collector = TableCollector::new();
    let err = reader(&store)
        .read_filter(&CancellationToken::new(), ReadFilterSpec::new(ORG, BUCKET), BOUNDS)
        .run(&mut collector)
        .await
        .unwrap_err();

    assert!(matches!(err, ReadError::Storage(StorageError::Cursor(_))));
    assert!(collector.is_empty());
    assert_all_released(&store.ledger());
}
