#![forbid(unsafe_code)]
//! tsread-table: turns storage cursors into streamed tables.
//!
//! - `schema` derives column lists and group keys.
//! - `dispatch` picks the typed builder for a cursor and starts the table.
//! - `table` is the streaming protocol: a producer task per table, a bounded
//!   chunk channel to the consumer and a completion signal for the read loop.

pub mod dispatch;
pub mod error;
pub mod schema;
pub mod table;

mod source;

pub use dispatch::{
    build_group_table, build_series_table, group_has_points, has_points, no_points_group_table,
    no_points_series_table, BuildContext,
};
pub use error::{Result, TableError};
pub use schema::{
    default_group_key_for_series, determine_table_cols_for_group, determine_table_cols_for_series,
    group_key_for_group, group_key_for_series, TableColumns,
};
pub use table::{ReadTable, TableHandle};
