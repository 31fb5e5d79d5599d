//! Conversion of row batches into Arrow record batches (feature `arrow`).

use std::sync::Arc;

use arrow_array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, RecordBatch, StringArray,
    TimestampNanosecondArray, UInt64Array,
};
use arrow_schema::{ArrowError, DataType as ArrowType, Field, Schema as ArrowSchema, TimeUnit};

use crate::schema::DataType;
use crate::types::{ColumnValues, RowBatch};

pub fn arrow_type(dt: DataType) -> ArrowType {
    match dt {
        DataType::Time => ArrowType::Timestamp(TimeUnit::Nanosecond, None),
        DataType::Int64 => ArrowType::Int64,
        DataType::UInt64 => ArrowType::UInt64,
        DataType::Float64 => ArrowType::Float64,
        DataType::Boolean => ArrowType::Boolean,
        DataType::Utf8 => ArrowType::Utf8,
    }
}

fn to_array(values: &ColumnValues) -> ArrayRef {
    match values {
        ColumnValues::Time(v) => Arc::new(TimestampNanosecondArray::from(v.clone())),
        ColumnValues::Int64(v) => Arc::new(Int64Array::from(v.clone())),
        ColumnValues::UInt64(v) => Arc::new(UInt64Array::from(v.clone())),
        ColumnValues::Float64(v) => Arc::new(Float64Array::from(v.clone())),
        ColumnValues::Boolean(v) => Arc::new(BooleanArray::from(v.clone())),
        ColumnValues::Utf8(v) => Arc::new(StringArray::from_iter_values(v.iter())),
    }
}

impl RowBatch {
    /// Copy this batch into an Arrow `RecordBatch`; all columns are non-nullable.
    pub fn to_record_batch(&self) -> Result<RecordBatch, ArrowError> {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|c| Field::new(&c.name, arrow_type(c.values.data_type()), false))
            .collect();
        let arrays: Vec<ArrayRef> = self.columns.iter().map(|c| to_array(&c.values)).collect();
        RecordBatch::try_new(Arc::new(ArrowSchema::new(fields)), arrays)
    }
}
