//! Producer side of a table: pulls cursor arrays and turns them into row chunks.
//!
//! A source owns every storage resource its table was built from and closes
//! each of them exactly once, either through `close` or on drop.

use tracing::warn;
use tsread_core::bounds::Bounds;
use tsread_core::schema::ColMeta;
use tsread_core::stats::ScanStatistics;
use tsread_core::types::{Column, ColumnValues, RowBatch};
use tsread_storage::{ArrayCursor, Closable, CursorValue, GroupCursor, TimestampArray};

use crate::error::Result;
use crate::schema::TableColumns;

pub(crate) trait ChunkSource: Send + 'static {
    /// Next non-empty chunk, `None` once every cursor is exhausted.
    fn next_chunk(&mut self) -> Result<Option<RowBatch>>;

    /// Release every owned resource. Safe to call more than once.
    fn close(&mut self);

    /// Statistics of every cursor read so far.
    fn stats(&self) -> ScanStatistics;
}

/// One row chunk: bounds repeated, the cursor's times and values, then the
/// tag values repeated.
pub(crate) fn chunk_to_batch<T: CursorValue>(
    cols: &[ColMeta],
    bounds: Bounds,
    arr: TimestampArray<T>,
    tag_values: &[String],
) -> RowBatch {
    let n = arr.len();
    let mut values = Vec::with_capacity(cols.len());
    values.push(ColumnValues::Time(vec![bounds.start; n]));
    values.push(ColumnValues::Time(vec![bounds.stop; n]));
    values.push(ColumnValues::Time(arr.timestamps));
    values.push(T::into_column(arr.values));
    for v in tag_values {
        values.push(ColumnValues::Utf8(vec![v.clone(); n]));
    }
    RowBatch {
        columns: cols
            .iter()
            .zip(values)
            .map(|(c, v)| Column::new(c.label.clone(), v))
            .collect(),
    }
}

/// Rows of one series.
pub(crate) struct SeriesSource<T: CursorValue> {
    cursor: Option<Box<dyn ArrayCursor<T>>>,
    cols: Vec<ColMeta>,
    tag_values: Vec<String>,
    bounds: Bounds,
    stats: ScanStatistics,
}

impl<T: CursorValue> SeriesSource<T> {
    pub(crate) fn new(
        cursor: Box<dyn ArrayCursor<T>>,
        cols: &TableColumns,
        tag_values: Vec<String>,
        bounds: Bounds,
    ) -> Self {
        Self {
            cursor: Some(cursor),
            cols: cols.cols.clone(),
            tag_values,
            bounds,
            stats: ScanStatistics::default(),
        }
    }
}

impl<T: CursorValue> ChunkSource for SeriesSource<T> {
    fn next_chunk(&mut self) -> Result<Option<RowBatch>> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };
        while let Some(arr) = cursor.next()? {
            if !arr.is_empty() {
                return Ok(Some(chunk_to_batch(
                    &self.cols,
                    self.bounds,
                    arr,
                    &self.tag_values,
                )));
            }
        }
        Ok(None)
    }

    fn close(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            self.stats += cursor.stats();
            cursor.close();
        }
    }

    fn stats(&self) -> ScanStatistics {
        match &self.cursor {
            Some(cursor) => self.stats + cursor.stats(),
            None => self.stats,
        }
    }
}

impl<T: CursorValue> Drop for SeriesSource<T> {
    fn drop(&mut self) {
        ChunkSource::close(self);
    }
}

/// Rows of every series of one partition, in partition order.
///
/// The value type is fixed by the first series; later series with a cursor
/// of another type are skipped and closed.
pub(crate) struct GroupSource<T: CursorValue> {
    group: Option<Box<dyn GroupCursor>>,
    cursor: Option<Box<dyn ArrayCursor<T>>>,
    columns: TableColumns,
    tag_values: Vec<String>,
    bounds: Bounds,
    stats: ScanStatistics,
}

impl<T: CursorValue> GroupSource<T> {
    /// `cursor` is the first series' cursor, already taken from `group`.
    pub(crate) fn new(
        group: Box<dyn GroupCursor>,
        cursor: Box<dyn ArrayCursor<T>>,
        columns: TableColumns,
        bounds: Bounds,
    ) -> Self {
        let tag_values = columns.tag_values(group.tags());
        Self {
            group: Some(group),
            cursor: Some(cursor),
            columns,
            tag_values,
            bounds,
            stats: ScanStatistics::default(),
        }
    }

    fn close_cursor(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            self.stats += cursor.stats();
            cursor.close();
        }
    }

    /// Move to the next series of the partition holding a cursor of type `T`.
    fn advance(&mut self) -> bool {
        let Some(group) = self.group.as_mut() else {
            return false;
        };
        while group.next() {
            let Some(cursor) = group.cursor() else {
                continue;
            };
            match T::from_cursor(cursor) {
                Ok(cursor) => {
                    self.tag_values = self.columns.tag_values(group.tags());
                    self.cursor = Some(cursor);
                    return true;
                }
                Err(mut other) => {
                    warn!(
                        expected = T::DATA_TYPE.name(),
                        found = other.value_type().name(),
                        "skipping series with mismatched value type in group"
                    );
                    self.stats += other.stats();
                    other.close();
                }
            }
        }
        false
    }
}

impl<T: CursorValue> ChunkSource for GroupSource<T> {
    fn next_chunk(&mut self) -> Result<Option<RowBatch>> {
        loop {
            if let Some(cursor) = self.cursor.as_mut() {
                match cursor.next()? {
                    Some(arr) if arr.is_empty() => continue,
                    Some(arr) => {
                        return Ok(Some(chunk_to_batch(
                            &self.columns.cols,
                            self.bounds,
                            arr,
                            &self.tag_values,
                        )))
                    }
                    None => self.close_cursor(),
                }
            }
            if !self.advance() {
                return Ok(None);
            }
        }
    }

    fn close(&mut self) {
        self.close_cursor();
        if let Some(mut group) = self.group.take() {
            group.close();
        }
    }

    fn stats(&self) -> ScanStatistics {
        match &self.cursor {
            Some(cursor) => self.stats + cursor.stats(),
            None => self.stats,
        }
    }
}

impl<T: CursorValue> Drop for GroupSource<T> {
    fn drop(&mut self) {
        ChunkSource::close(self);
    }
}
