//! Typed cursors over one series.
//!
//! The five value types form a closed set: `Cursor` is an enum, so every
//! consumer dispatches with an exhaustive `match` and there is no "unknown
//! cursor type" case to handle at runtime.

use tsread_core::schema::DataType;
use tsread_core::stats::ScanStatistics;
use tsread_core::types::ColumnValues;

use crate::error::Result;
use crate::guard::Closable;

/// Scalar types a cursor may yield.
pub trait CursorValue: Clone + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    fn into_column(values: Vec<Self>) -> ColumnValues;

    /// Bytes accounted to scan statistics for this value.
    fn scanned_bytes(&self) -> u64;

    /// Unwrap a cursor of this value type, handing any other variant back.
    fn from_cursor(cursor: Cursor) -> std::result::Result<Box<dyn ArrayCursor<Self>>, Cursor>;
}

macro_rules! fixed_width_value {
    ($ty:ty, $dt:expr, $variant:ident, $cursor:ident) => {
        impl CursorValue for $ty {
            const DATA_TYPE: DataType = $dt;

            fn into_column(values: Vec<Self>) -> ColumnValues {
                ColumnValues::$variant(values)
            }

            fn scanned_bytes(&self) -> u64 {
                std::mem::size_of::<$ty>() as u64
            }

            fn from_cursor(
                cursor: Cursor,
            ) -> std::result::Result<Box<dyn ArrayCursor<Self>>, Cursor> {
                match cursor {
                    Cursor::$cursor(c) => Ok(c),
                    other => Err(other),
                }
            }
        }
    };
}

fixed_width_value!(i64, DataType::Int64, Int64, Integer);
fixed_width_value!(u64, DataType::UInt64, UInt64, Unsigned);
fixed_width_value!(f64, DataType::Float64, Float64, Float);
fixed_width_value!(bool, DataType::Boolean, Boolean, Boolean);

impl CursorValue for String {
    const DATA_TYPE: DataType = DataType::Utf8;

    fn into_column(values: Vec<Self>) -> ColumnValues {
        ColumnValues::Utf8(values)
    }

    fn scanned_bytes(&self) -> u64 {
        self.len() as u64
    }

    fn from_cursor(cursor: Cursor) -> std::result::Result<Box<dyn ArrayCursor<Self>>, Cursor> {
        match cursor {
            Cursor::String(c) => Ok(c),
            other => Err(other),
        }
    }
}

/// Parallel timestamp/value arrays, as produced by one cursor step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimestampArray<T> {
    pub timestamps: Vec<i64>,
    pub values: Vec<T>,
}

impl<T> TimestampArray<T> {
    pub fn new(timestamps: Vec<i64>, values: Vec<T>) -> Self {
        debug_assert_eq!(timestamps.len(), values.len());
        Self { timestamps, values }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

impl<T> FromIterator<(i64, T)> for TimestampArray<T> {
    fn from_iter<I: IntoIterator<Item = (i64, T)>>(iter: I) -> Self {
        let (timestamps, values) = iter.into_iter().unzip();
        Self { timestamps, values }
    }
}

/// A cursor of one value type.
///
/// `next` returns `Ok(None)` once exhausted. `close` must be called exactly
/// once by whoever owns the cursor.
pub trait ArrayCursor<T>: Send {
    fn next(&mut self) -> Result<Option<TimestampArray<T>>>;

    fn close(&mut self);

    fn stats(&self) -> ScanStatistics;
}

/// A cursor of any of the five supported value types.
pub enum Cursor {
    Integer(Box<dyn ArrayCursor<i64>>),
    Float(Box<dyn ArrayCursor<f64>>),
    Unsigned(Box<dyn ArrayCursor<u64>>),
    Boolean(Box<dyn ArrayCursor<bool>>),
    String(Box<dyn ArrayCursor<String>>),
}

impl Cursor {
    pub fn value_type(&self) -> DataType {
        match self {
            Cursor::Integer(_) => DataType::Int64,
            Cursor::Float(_) => DataType::Float64,
            Cursor::Unsigned(_) => DataType::UInt64,
            Cursor::Boolean(_) => DataType::Boolean,
            Cursor::String(_) => DataType::Utf8,
        }
    }

    pub fn stats(&self) -> ScanStatistics {
        match self {
            Cursor::Integer(c) => c.stats(),
            Cursor::Float(c) => c.stats(),
            Cursor::Unsigned(c) => c.stats(),
            Cursor::Boolean(c) => c.stats(),
            Cursor::String(c) => c.stats(),
        }
    }

    /// Read until the first non-empty array and report whether one was found.
    /// Empty arrays are skipped. Leaves the cursor open.
    pub fn has_rows(&mut self) -> Result<bool> {
        match self {
            Cursor::Integer(c) => first_non_empty(c.as_mut()),
            Cursor::Float(c) => first_non_empty(c.as_mut()),
            Cursor::Unsigned(c) => first_non_empty(c.as_mut()),
            Cursor::Boolean(c) => first_non_empty(c.as_mut()),
            Cursor::String(c) => first_non_empty(c.as_mut()),
        }
    }
}

fn first_non_empty<T>(cursor: &mut dyn ArrayCursor<T>) -> Result<bool> {
    while let Some(arr) = cursor.next()? {
        if !arr.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

impl Closable for Cursor {
    fn close(&mut self) {
        match self {
            Cursor::Integer(c) => c.close(),
            Cursor::Float(c) => c.close(),
            Cursor::Unsigned(c) => c.close(),
            Cursor::Boolean(c) => c.close(),
            Cursor::String(c) => c.close(),
        }
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cursor({})", self.value_type().name())
    }
}
