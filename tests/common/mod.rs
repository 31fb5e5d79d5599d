//! Shared fixtures for the read-path integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use tsread::exec::{ReadError, StoreReader, TableConsumer};
use tsread::prelude::*;
use tsread::storage::predicate::Node;
use tsread::storage::ResourceLedger;

pub const ORG: OrgId = OrgId::new(7);
pub const BUCKET: BucketId = BucketId::new(9);
pub const BOUNDS: Bounds = Bounds::new(100, 200);

/// Compiles `key == value` clauses joined by ` and `.
pub struct TagEqCompiler;

impl PredicateCompiler for TagEqCompiler {
    type Expr = String;

    fn compile(&self, expr: &String) -> Result<Predicate, PredicateError> {
        let clauses = expr
            .split(" and ")
            .map(|clause| {
                let (key, value) = clause
                    .split_once("==")
                    .ok_or_else(|| PredicateError::Invalid(format!("bad clause {clause:?}")))?;
                Ok(Node::tag_eq(key.trim(), value.trim()))
            })
            .collect::<Result<Vec<_>, PredicateError>>()?;
        Ok(Predicate::new(Node::and(clauses)))
    }
}

pub fn reader(store: &MemStore) -> StoreReader<TagEqCompiler> {
    StoreReader::new(Arc::new(store.clone()), TagEqCompiler)
}

pub fn ints(points: &[(i64, i64)]) -> SeriesData {
    SeriesData::Integer(points.iter().copied().collect())
}

pub fn floats(points: &[(i64, f64)]) -> SeriesData {
    SeriesData::Float(points.iter().copied().collect())
}

pub fn series(tags: &[(&str, &str)], data: SeriesData) -> MemSeries {
    MemSeries::new(ORG, BUCKET, Tags::from_pairs(tags), data)
}

/// cpu series on hosts a, b and c; a and b are in `west`. Host c has no
/// points inside `BOUNDS`.
pub fn cpu_store() -> MemStore {
    let store = MemStore::new().with_batch_size(2);
    store.insert(series(
        &[("_measurement", "cpu"), ("host", "a"), ("region", "west")],
        ints(&[(150, 42)]),
    ));
    store.insert(series(
        &[("_measurement", "cpu"), ("host", "b"), ("region", "west")],
        ints(&[(110, 1), (120, 2), (130, 3), (140, 4), (250, 5)]),
    ));
    store.insert(series(
        &[("_measurement", "cpu"), ("host", "c"), ("region", "east")],
        ints(&[(300, 9)]),
    ));
    store
}

pub fn assert_all_released(ledger: &ResourceLedger) {
    assert_eq!(ledger.outstanding(), 0, "resources left open");
    assert_eq!(ledger.double_closed(), 0, "resources closed twice");
}

pub fn str_column(rows: &RowBatch, name: &str) -> Vec<String> {
    match rows.column(name).map(|c| &c.values) {
        Some(ColumnValues::Utf8(v)) => v.clone(),
        other => panic!("column {name} is not a string column: {other:?}"),
    }
}

/// Fails on the n-th table it receives (0-based), collecting the rest.
pub struct FailingConsumer {
    pub fail_at: usize,
    pub seen: usize,
}

#[async_trait::async_trait]
impl TableConsumer for FailingConsumer {
    async fn consume(&mut self, table: ReadTable) -> Result<(), ReadError> {
        let n = self.seen;
        self.seen += 1;
        if n == self.fail_at {
            return Err(ReadError::consumer(format!("rejected table {n}")));
        }
        table.collect().await?;
        Ok(())
    }
}
