#![forbid(unsafe_code)]
//! tsread: read path from time-series storage cursors to streamed tables.
//!
//! Facade over the member crates:
//! - `core`: ids, bounds, schema, row batches, group keys, config
//! - `storage`: the storage-engine contract and the in-memory engine
//! - `table`: schema derivation, typed table builders, streaming protocol
//! - `exec`: read coordinators and table consumers

pub use tsread_core as core;
pub use tsread_exec as exec;
pub use tsread_storage as storage;
pub use tsread_table as table;

pub mod prelude {
    pub use tsread_core::prelude::{
        BucketId, Bounds, ColMeta, Column, ColumnValues, DataType, GroupKey, GroupMode, OrgId,
        ReaderConfig, RowBatch, Scalar, ScanStatistics, Schema, Time,
    };
    pub use tsread_exec::{
        CollectedTable, ReadError, ReadFilterSpec, ReadSpec, ReadTagKeysSpec, ReadTagValuesSpec,
        StoreReader, TableCollector, TableConsumer, TableIterator,
    };
    pub use tsread_storage::{
        Cursor, MemSeries, MemStore, Predicate, PredicateCompiler, PredicateError, SeriesData,
        Store, Tags, TimestampArray,
    };
    pub use tsread_table::{ReadTable, TableError};
}
