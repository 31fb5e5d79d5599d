//! Value-type dispatch: one cursor variant in, one typed table out.
//!
//! Each `Cursor` variant selects the matching instantiation of the same
//! generic builder. The match is exhaustive, so adding a value type is a
//! compile error here until it is handled.

use tokio_util::sync::CancellationToken;
use tsread_core::bounds::Bounds;
use tsread_core::group_key::GroupKey;
use tsread_core::schema::{ColMeta, DataType};
use tsread_core::stats::ScanStatistics;
use tsread_storage::{ArrayCursor, Cursor, CursorValue, GroupCursor, Guarded, Tags};

use crate::error::Result;
use crate::schema::{determine_table_cols_for_group, determine_table_cols_for_series};
use crate::source::{ChunkSource, GroupSource, SeriesSource};
use crate::table::{ReadTable, TableHandle};

/// What every table of one read shares.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub bounds: Bounds,
    /// Row chunks buffered per table.
    pub buffer: usize,
    /// Cancelling this stops every table built with the context.
    pub cancel: &'a CancellationToken,
}

/// Build the table of one series. Takes ownership of `cursor`.
pub fn build_series_table(
    cursor: Cursor,
    tags: &Tags,
    key: GroupKey,
    ctx: &BuildContext<'_>,
) -> Result<TableHandle> {
    match cursor {
        Cursor::Integer(c) => series_table(c, tags, key, ctx),
        Cursor::Float(c) => series_table(c, tags, key, ctx),
        Cursor::Unsigned(c) => series_table(c, tags, key, ctx),
        Cursor::Boolean(c) => series_table(c, tags, key, ctx),
        Cursor::String(c) => series_table(c, tags, key, ctx),
    }
}

fn series_table<T: CursorValue>(
    cursor: Box<dyn ArrayCursor<T>>,
    tags: &Tags,
    key: GroupKey,
    ctx: &BuildContext<'_>,
) -> Result<TableHandle> {
    let cols = determine_table_cols_for_series(tags, T::DATA_TYPE);
    let tag_values = cols.tag_values(tags);
    let source = SeriesSource::new(cursor, &cols, tag_values, ctx.bounds);
    start(source, key, cols.cols, ctx)
}

/// Build the table of one partition. Takes ownership of `group`; the first
/// series holding a cursor decides the value type.
pub fn build_group_table(
    group: Box<dyn GroupCursor>,
    key: GroupKey,
    ctx: &BuildContext<'_>,
) -> Result<TableHandle> {
    let mut group = Guarded::new(group);
    let cursor = loop {
        if !group.next() {
            return Ok(TableHandle::empty(key, ScanStatistics::default()));
        }
        if let Some(cursor) = group.cursor() {
            break cursor;
        }
    };
    let group = group.into_inner();
    match cursor {
        Cursor::Integer(c) => group_table(group, c, key, ctx),
        Cursor::Float(c) => group_table(group, c, key, ctx),
        Cursor::Unsigned(c) => group_table(group, c, key, ctx),
        Cursor::Boolean(c) => group_table(group, c, key, ctx),
        Cursor::String(c) => group_table(group, c, key, ctx),
    }
}

fn group_table<T: CursorValue>(
    group: Box<dyn GroupCursor>,
    cursor: Box<dyn ArrayCursor<T>>,
    key: GroupKey,
    ctx: &BuildContext<'_>,
) -> Result<TableHandle> {
    let columns = determine_table_cols_for_group(group.keys(), T::DATA_TYPE);
    let cols = columns.cols.clone();
    let source = GroupSource::new(group, cursor, columns, ctx.bounds);
    start(source, key, cols, ctx)
}

/// Read the first chunk in place: an exhausted source becomes an empty
/// handle, anything else gets a producer task.
fn start<S: ChunkSource>(
    mut source: S,
    key: GroupKey,
    cols: Vec<ColMeta>,
    ctx: &BuildContext<'_>,
) -> Result<TableHandle> {
    match source.next_chunk() {
        Ok(Some(first)) => Ok(TableHandle::spawn(
            key, cols, first, source, ctx.buffer, ctx.cancel,
        )),
        Ok(None) => {
            source.close();
            Ok(TableHandle::empty(key, source.stats()))
        }
        Err(e) => {
            source.close();
            Err(e)
        }
    }
}

/// Zero-row table of a series for metadata-only reads. `_value` is a string
/// column since no cursor decides its type.
pub fn no_points_series_table(tags: &Tags, key: GroupKey) -> TableHandle {
    let cols = determine_table_cols_for_series(tags, DataType::Utf8);
    TableHandle::ready(ReadTable::materialized(key, cols.cols, None))
}

/// Zero-row table of a partition for metadata-only reads.
pub fn no_points_group_table(keys: &[String], key: GroupKey) -> TableHandle {
    let cols = determine_table_cols_for_group(keys, DataType::Utf8);
    TableHandle::ready(ReadTable::materialized(key, cols.cols, None))
}

/// Whether `cursor` yields at least one point. Empty arrays are skipped the
/// same way the table producers skip them. The cursor is always closed.
pub fn has_points(cursor: Option<Cursor>) -> Result<bool> {
    let Some(cursor) = cursor else {
        return Ok(false);
    };
    let mut cursor = Guarded::new(cursor);
    Ok(cursor.has_rows()?)
}

/// Check the partition's series in order until one has points.
pub fn group_has_points(group: &mut dyn GroupCursor) -> Result<bool> {
    while group.next() {
        if has_points(group.cursor())? {
            return Ok(true);
        }
    }
    Ok(false)
}
