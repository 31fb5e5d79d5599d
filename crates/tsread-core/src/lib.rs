#![forbid(unsafe_code)]
//! tsread-core: ids, bounds, column schema, row batches, group keys and config.
//!
//! Everything here is plain data shared by the storage contract, the table
//! builders and the read coordinators. No async or IO lives in core.

pub mod bounds;
pub mod config;
pub mod error;
pub mod group_key;
pub mod hash;
pub mod id;
pub mod prelude;
pub mod schema;
pub mod stats;
pub mod types;

#[cfg(feature = "arrow")]
pub mod arrow;

pub use error::{Error, Result};
