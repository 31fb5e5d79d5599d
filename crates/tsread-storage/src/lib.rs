#![forbid(unsafe_code)]
//! tsread-storage: the storage-engine contract consumed by the read path.
//!
//! The storage engine itself is external. This crate only fixes its shape:
//! typed cursors (a closed enum over five value types), result sets and group
//! result sets, request descriptors and the compiled predicate tree.
//! `MemStore` is an in-memory engine honoring the same contract; tests and
//! benches drive the read path through it.

pub mod cursor;
pub mod error;
pub mod guard;
pub mod memory;
pub mod predicate;
pub mod request;
pub mod result_set;
pub mod store;
pub mod tags;

pub use cursor::{ArrayCursor, Cursor, CursorValue, TimestampArray};
pub use error::{Result, StorageError};
pub use guard::{Closable, Guarded};
pub use memory::{MemSeries, MemStore, RecordedRequest, ResourceLedger, SeriesData};
pub use predicate::{Predicate, PredicateCompiler, PredicateError};
pub use request::{
    Aggregate, AggregateType, Group, ReadFilterRequest, ReadHints, ReadRequest, ReadSource,
    TagKeysRequest, TagValuesRequest, TimestampRange, NO_POINTS_LIMIT,
};
pub use result_set::{GroupCursor, GroupResultSet, ResultSet, StringIterator};
pub use store::Store;
pub use tags::{Tag, Tags};
