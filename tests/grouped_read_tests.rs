//! Bounded reads under each group mode.

mod common;

use common::*;
use tokio_util::sync::CancellationToken;
use tsread::prelude::*;
use tsread::storage::{AggregateType, Group, RecordedRequest, StorageError};
use tsread::table::TableError;

async fn run_read(store: &MemStore, spec: ReadSpec<String>) -> Result<TableCollector, ReadError> {
    let mut collector = TableCollector::new();
    reader(store)
        .read(&CancellationToken::new(), spec, BOUNDS)
        .run(&mut collector)
        .await?;
    Ok(collector)
}

fn only_request(store: &MemStore) -> RecordedRequest {
    let mut requests = store.requests();
    assert_eq!(requests.len(), 1, "expected exactly one storage request");
    requests.remove(0)
}

#[tokio::test]
async fn group_by_region_streams_one_table_per_partition() {
    let store = cpu_store();
    let spec = ReadSpec::new(ORG, BUCKET).with_group(GroupMode::By, &["region"]);
    let collector = run_read(&store, spec).await.unwrap();

    // east only holds host c, which has no points in bounds
    assert_eq!(collector.len(), 1);
    let west = &collector.tables()[0];
    assert_eq!(west.key.labels(), vec!["_start", "_stop", "region"]);
    assert_eq!(west.key.value("region"), Some(&Scalar::Str("west".into())));
    assert_eq!(
        west.rows.schema().labels(),
        vec!["_start", "_stop", "_time", "_value", "region"]
    );
    assert_eq!(west.rows.num_rows(), 5);
    assert_eq!(str_column(&west.rows, "region"), vec!["west"; 5]);
    assert_eq!(
        west.rows.column("_value").map(|c| c.values.clone()),
        Some(ColumnValues::Int64(vec![42, 1, 2, 3, 4]))
    );

    let RecordedRequest::GroupRead(req) = only_request(&store) else {
        panic!("expected a group read");
    };
    assert_eq!(req.group, Group::By);
    assert_eq!(req.group_keys, vec!["region".to_string()]);
    assert_all_released(&store.ledger());
}

#[tokio::test]
async fn group_none_merges_every_series() {
    let store = cpu_store();
    let spec = ReadSpec::new(ORG, BUCKET).with_group(GroupMode::None, &[]);
    let collector = run_read(&store, spec).await.unwrap();

    assert_eq!(collector.len(), 1);
    let table = &collector.tables()[0];
    assert_eq!(table.key.labels(), vec!["_start", "_stop"]);
    assert_eq!(
        table.rows.schema().labels(),
        vec!["_start", "_stop", "_time", "_value", "_measurement", "host", "region"]
    );
    assert_eq!(str_column(&table.rows, "host"), vec!["a", "b", "b", "b", "b"]);

    let RecordedRequest::GroupRead(req) = only_request(&store) else {
        panic!("expected a group read");
    };
    assert_eq!(req.group, Group::None);
    assert_all_released(&store.ledger());
}

#[tokio::test]
async fn group_all_matches_read_filter() {
    let store = cpu_store();
    let spec = ReadSpec::new(ORG, BUCKET).with_group(GroupMode::All, &[]);
    let grouped = run_read(&store, spec).await.unwrap();

    let mut filtered = TableCollector::new();
    reader(&store)
        .read_filter(&CancellationToken::new(), ReadFilterSpec::new(ORG, BUCKET), BOUNDS)
        .run(&mut filtered)
        .await
        .unwrap();

    assert_eq!(grouped.tables(), filtered.tables());
    assert!(matches!(store.requests()[0], RecordedRequest::Read(_)));
    assert_all_released(&store.ledger());
}

#[tokio::test]
async fn default_mode_behaves_like_all() {
    let store = cpu_store();
    let default = run_read(&store, ReadSpec::new(ORG, BUCKET)).await.unwrap();
    let all = run_read(&store, ReadSpec::new(ORG, BUCKET).with_group(GroupMode::All, &[]))
        .await
        .unwrap();
    assert_eq!(default.tables(), all.tables());
    assert_eq!(default.len(), 2);

    let a = default.tables()[0].key.fingerprint();
    let b = default.tables()[1].key.fingerprint();
    assert_ne!(a, b);
    assert_eq!(a, all.tables()[0].key.fingerprint());
}

#[tokio::test]
async fn group_by_missing_key_uses_empty_value() {
    let store = cpu_store();
    let spec = ReadSpec::new(ORG, BUCKET).with_group(GroupMode::By, &["rack"]);
    let collector = run_read(&store, spec).await.unwrap();

    assert_eq!(collector.len(), 1);
    let table = &collector.tables()[0];
    assert_eq!(table.key.value("rack"), Some(&Scalar::Str(String::new())));
    assert_eq!(str_column(&table.rows, "rack"), vec![""; 5]);
}

#[tokio::test]
async fn group_by_bounds_columns_adds_nothing_to_the_key() {
    let store = cpu_store();
    let spec = ReadSpec::new(ORG, BUCKET).with_group(GroupMode::By, &["_start", "region"]);
    let collector = run_read(&store, spec).await.unwrap();

    let table = &collector.tables()[0];
    assert_eq!(table.key.labels(), vec!["_start", "_stop", "region"]);
    assert_eq!(table.key.value("_start"), Some(&Scalar::Time(100)));
}

#[tokio::test]
async fn mismatched_series_in_a_partition_are_skipped() {
    let store = cpu_store();
    store.insert(series(
        &[("_measurement", "cpu"), ("host", "bb"), ("region", "west")],
        floats(&[(170, 0.5)]),
    ));
    let spec = ReadSpec::new(ORG, BUCKET).with_group(GroupMode::By, &["region"]);
    let collector = run_read(&store, spec).await.unwrap();

    let west = &collector.tables()[0];
    assert_eq!(west.rows.schema().columns[3].data_type, DataType::Int64);
    assert_eq!(west.rows.num_rows(), 5);
    assert_all_released(&store.ledger());
}

#[tokio::test]
async fn except_fails_before_storage_is_called() {
    let store = cpu_store();
    let spec = ReadSpec::new(ORG, BUCKET).with_group(GroupMode::Except, &["host"]);
    let err = run_read(&store, spec).await.unwrap_err();

    assert!(matches!(
        err,
        ReadError::Table(TableError::UnsupportedGroupMode(GroupMode::Except))
    ));
    assert!(store.requests().is_empty());
    assert_eq!(store.ledger().opened(), 0);
}

#[tokio::test]
async fn aggregate_method_is_forwarded() {
    let store = cpu_store();
    let spec = ReadSpec::new(ORG, BUCKET)
        .with_group(GroupMode::By, &["region"])
        .with_aggregate("max");
    run_read(&store, spec).await.unwrap();

    let RecordedRequest::GroupRead(req) = only_request(&store) else {
        panic!("expected a group read");
    };
    assert_eq!(req.aggregate.map(|a| a.kind), Some(AggregateType::Max));
}

#[tokio::test]
async fn unknown_aggregate_fails_before_storage_is_called() {
    let store = cpu_store();
    let spec = ReadSpec::new(ORG, BUCKET).with_aggregate("bogus");
    let err = run_read(&store, spec).await.unwrap_err();

    assert!(matches!(err, ReadError::UnknownAggregate(ref m) if m == "bogus"));
    assert!(store.requests().is_empty());
}

#[tokio::test]
async fn descending_and_points_limit_reach_the_cursors() {
    let store = cpu_store();
    let mut spec = ReadSpec::new(ORG, BUCKET);
    spec.descending = true;
    spec.points_limit = 2;
    let collector = run_read(&store, spec).await.unwrap();

    let b = &collector.tables()[1].rows;
    assert_eq!(
        b.column("_time").map(|c| c.values.clone()),
        Some(ColumnValues::Time(vec![140, 130]))
    );

    let RecordedRequest::Read(req) = only_request(&store) else {
        panic!("expected a read");
    };
    assert!(req.descending);
    assert_eq!(req.points_limit, 2);
    assert!(!req.hints.no_points());
}

#[tokio::test]
async fn series_limit_and_offset_apply_per_partition() {
    let store = cpu_store();
    let mut spec = ReadSpec::new(ORG, BUCKET).with_group(GroupMode::None, &[]);
    spec.series_offset = 1;
    spec.series_limit = 1;
    let collector = run_read(&store, spec).await.unwrap();

    assert_eq!(collector.len(), 1);
    assert_eq!(str_column(&collector.tables()[0].rows, "host"), vec!["b"; 4]);
}

#[tokio::test]
async fn group_result_set_error_is_returned() {
    let store = cpu_store();
    store.fail_result_sets("partition lost");
    let spec = ReadSpec::new(ORG, BUCKET).with_group(GroupMode::By, &["region"]);
    let err = run_read(&store, spec).await.unwrap_err();

    assert!(matches!(
        err,
        ReadError::Storage(StorageError::Engine(ref m)) if m == "partition lost"
    ));
    assert_all_released(&store.ledger());
}

#[tokio::test]
async fn nil_group_result_set_completes_empty() {
    let store = cpu_store();
    store.return_nil_result_sets();
    let spec = ReadSpec::new(ORG, BUCKET).with_group(GroupMode::By, &["region"]);
    let collector = run_read(&store, spec).await.unwrap();
    assert!(collector.is_empty());
}
