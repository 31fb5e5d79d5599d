#![forbid(unsafe_code)]
//! tsread-exec: read coordinators over a storage engine.
//!
//! `StoreReader` compiles the caller's predicate, issues one storage request
//! per call and drives the result set into a `TableConsumer`, one table at a
//! time, honoring the call's cancellation token.

pub mod aggregate;
pub mod consumer;
pub mod descriptor;
pub mod error;
pub mod metrics;
pub mod reader;

pub use aggregate::{convert_group_mode, determine_aggregate_method};
pub use consumer::{CollectedTable, TableCollector, TableConsumer};
pub use descriptor::{ReadFilterSpec, ReadSpec, ReadTagKeysSpec, ReadTagValuesSpec};
pub use error::{BoxError, ReadError, Result};
pub use reader::{
    storage_tag_key, FilterIterator, ReadIterator, StoreReader, TableIterator, TagKeysIterator,
    TagValuesIterator,
};
