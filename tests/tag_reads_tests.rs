//! Tag-keys and tag-values reads.

mod common;

use common::*;
use tokio_util::sync::CancellationToken;
use tsread::prelude::*;
use tsread::storage::{RecordedRequest, StorageError};

async fn tag_values(store: &MemStore, spec: ReadTagValuesSpec<String>) -> Vec<String> {
    let mut collector = TableCollector::new();
    reader(store)
        .read_tag_values(&CancellationToken::new(), spec, BOUNDS)
        .run(&mut collector)
        .await
        .unwrap();
    let tables = collector.into_tables();
    assert_eq!(tables.len(), 1);
    assert!(tables[0].key.is_empty());
    str_column(&tables[0].rows, "_value")
}

#[tokio::test]
async fn tag_keys_lists_keys_of_series_in_bounds() {
    let store = cpu_store();
    store.insert(series(&[("rack", "r1")], ints(&[(500, 1)])));

    let mut collector = TableCollector::new();
    reader(&store)
        .read_tag_keys(&CancellationToken::new(), ReadTagKeysSpec::new(ORG, BUCKET), BOUNDS)
        .run(&mut collector)
        .await
        .unwrap();

    assert_eq!(collector.len(), 1);
    let table = &collector.tables()[0];
    assert!(table.key.is_empty());
    assert_eq!(table.rows.schema().labels(), vec!["_value"]);
    assert_eq!(
        str_column(&table.rows, "_value"),
        vec!["_measurement", "host", "region"]
    );
}

#[tokio::test]
async fn tag_values_lists_distinct_values_in_bounds() {
    let store = cpu_store();
    let values = tag_values(&store, ReadTagValuesSpec::new(ORG, BUCKET, "host")).await;
    assert_eq!(values, vec!["a", "b"]);
}

#[tokio::test]
async fn tag_values_honors_the_predicate() {
    let store = cpu_store();
    let spec = ReadTagValuesSpec::new(ORG, BUCKET, "host").with_predicate("host == b".to_string());
    assert_eq!(tag_values(&store, spec).await, vec!["b"]);

    let spec =
        ReadTagValuesSpec::new(ORG, BUCKET, "host").with_predicate("region == east".to_string());
    assert!(tag_values(&store, spec).await.is_empty());
}

#[tokio::test]
async fn measurement_alias_is_translated() {
    let store = cpu_store();
    let values = tag_values(&store, ReadTagValuesSpec::new(ORG, BUCKET, "_measurement")).await;
    assert_eq!(values, vec!["cpu"]);

    let requests = store.requests();
    let [RecordedRequest::TagValues(req)] = requests.as_slice() else {
        panic!("expected one tag values request");
    };
    assert_eq!(req.tag_key, "\x00");
}

#[tokio::test]
async fn bad_predicate_issues_no_request() {
    let store = cpu_store();
    let spec = ReadTagKeysSpec::new(ORG, BUCKET).with_predicate("host".to_string());
    let err = reader(&store)
        .read_tag_keys(&CancellationToken::new(), spec, BOUNDS)
        .run(&mut TableCollector::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ReadError::Predicate(PredicateError::Invalid(_))));
    assert!(store.requests().is_empty());
}

#[tokio::test]
async fn storage_failure_is_returned() {
    let store = cpu_store();
    store.fail_requests("tag index offline");
    let mut collector = TableCollector::new();
    let err = reader(&store)
        .read_tag_values(
            &CancellationToken::new(),
            ReadTagValuesSpec::new(ORG, BUCKET, "host"),
            BOUNDS,
        )
        .run(&mut collector)
        .await
        .unwrap_err();

    assert!(matches!(err, ReadError::Storage(StorageError::Engine(_))));
    assert!(collector.is_empty());
}
