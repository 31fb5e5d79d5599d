//! Metadata-only reads: zero-row tables for every series or partition that
//! has points in bounds.

mod common;

use common::*;
use tokio_util::sync::CancellationToken;
use tsread::prelude::*;
use tsread::storage::RecordedRequest;

async fn keys_and_tables(store: &MemStore, spec: ReadSpec<String>) -> Vec<CollectedTable> {
    let mut collector = TableCollector::new();
    reader(store)
        .read(&CancellationToken::new(), spec, BOUNDS)
        .run(&mut collector)
        .await
        .unwrap();
    collector.into_tables()
}

fn keys(tables: &[CollectedTable]) -> Vec<GroupKey> {
    tables.iter().map(|t| t.key.clone()).collect()
}

#[tokio::test]
async fn series_presence_matches_the_full_read() {
    let store = cpu_store();
    let full = keys_and_tables(&store, ReadSpec::new(ORG, BUCKET)).await;
    let meta = keys_and_tables(&store, ReadSpec::new(ORG, BUCKET).no_points()).await;

    assert_eq!(keys(&meta), keys(&full));
    for table in &meta {
        assert_eq!(table.rows.num_rows(), 0);
        assert_eq!(table.rows.schema().columns[3].data_type, DataType::Utf8);
        assert_eq!(
            table.rows.schema().labels(),
            vec!["_start", "_stop", "_time", "_value", "_measurement", "host", "region"]
        );
    }
    assert_all_released(&store.ledger());
}

#[tokio::test]
async fn partition_presence_matches_the_full_read() {
    let store = cpu_store();
    let by_region = |spec: ReadSpec<String>| spec.with_group(GroupMode::By, &["region"]);
    let full = keys_and_tables(&store, by_region(ReadSpec::new(ORG, BUCKET))).await;
    let meta = keys_and_tables(&store, by_region(ReadSpec::new(ORG, BUCKET).no_points())).await;

    assert_eq!(keys(&meta), keys(&full));
    assert_eq!(meta.len(), 1);
    assert_eq!(meta[0].rows.num_rows(), 0);
    assert_eq!(
        meta[0].rows.schema().labels(),
        vec!["_start", "_stop", "_time", "_value", "region"]
    );
    assert_all_released(&store.ledger());
}

#[tokio::test]
async fn no_points_hint_is_sent() {
    let store = cpu_store();
    keys_and_tables(&store, ReadSpec::new(ORG, BUCKET).no_points()).await;

    let requests = store.requests();
    let [RecordedRequest::Read(req)] = requests.as_slice() else {
        panic!("expected one read request");
    };
    assert!(req.hints.no_points());
    assert_eq!(req.points_limit, -1);
}

#[tokio::test]
async fn series_without_cursor_are_absent() {
    let store = MemStore::new();
    store.insert(series(&[("host", "nil")], SeriesData::Nil));
    store.insert(series(&[("host", "old")], ints(&[(10, 1)])));
    store.insert(series(&[("host", "live")], floats(&[(199, 1.0)])));

    let meta = keys_and_tables(&store, ReadSpec::new(ORG, BUCKET).no_points()).await;
    assert_eq!(meta.len(), 1);
    assert_eq!(meta[0].key.value("host"), Some(&Scalar::Str("live".into())));
    assert_all_released(&store.ledger());
}

#[tokio::test]
async fn partition_without_points_is_absent() {
    let store = MemStore::new();
    store.insert(series(&[("dc", "x")], ints(&[(300, 1)])));
    store.insert(series(&[("dc", "y")], ints(&[])));

    let spec = ReadSpec::new(ORG, BUCKET)
        .with_group(GroupMode::By, &["dc"])
        .no_points();
    let meta = keys_and_tables(&store, spec).await;
    assert!(meta.is_empty());
    assert_all_released(&store.ledger());
}
