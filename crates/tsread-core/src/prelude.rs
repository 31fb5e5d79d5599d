//! Convenient re-exports for downstream crates.

pub use crate::bounds::{Bounds, Time};
pub use crate::config::ReaderConfig;
pub use crate::error::{Error, Result};
pub use crate::group_key::{GroupKey, GroupMode};
pub use crate::id::{BucketId, OrgId};
pub use crate::schema::{
    ColMeta, DataType, Schema, DEFAULT_START_COL_LABEL, DEFAULT_STOP_COL_LABEL,
    DEFAULT_TIME_COL_LABEL, DEFAULT_VALUE_COL_LABEL,
};
pub use crate::stats::ScanStatistics;
pub use crate::types::{Column, ColumnValues, RowBatch, Scalar};
