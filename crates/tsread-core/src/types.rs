//! Lightweight value/column types for the streamed tables.
//!
//! Columns are stored typed (one `Vec` per column) so a value column never
//! boxes each sample. Enable the `arrow` feature to convert a `RowBatch`
//! into an Arrow `RecordBatch` downstream.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{ColMeta, DataType, Schema};

/// A single value, used for group-key entries and row inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Time(i64),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Str(String),
}

impl Scalar {
    pub fn data_type(&self) -> DataType {
        match self {
            Scalar::Null => DataType::Utf8, // nulls only appear in string columns
            Scalar::Time(_) => DataType::Time,
            Scalar::I64(_) => DataType::Int64,
            Scalar::U64(_) => DataType::UInt64,
            Scalar::F64(_) => DataType::Float64,
            Scalar::Bool(_) => DataType::Boolean,
            Scalar::Str(_) => DataType::Utf8,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Typed storage for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValues {
    Time(Vec<i64>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Float64(Vec<f64>),
    Boolean(Vec<bool>),
    Utf8(Vec<String>),
}

impl ColumnValues {
    pub fn with_capacity(data_type: DataType, cap: usize) -> Self {
        match data_type {
            DataType::Time => ColumnValues::Time(Vec::with_capacity(cap)),
            DataType::Int64 => ColumnValues::Int64(Vec::with_capacity(cap)),
            DataType::UInt64 => ColumnValues::UInt64(Vec::with_capacity(cap)),
            DataType::Float64 => ColumnValues::Float64(Vec::with_capacity(cap)),
            DataType::Boolean => ColumnValues::Boolean(Vec::with_capacity(cap)),
            DataType::Utf8 => ColumnValues::Utf8(Vec::with_capacity(cap)),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ColumnValues::Time(_) => DataType::Time,
            ColumnValues::Int64(_) => DataType::Int64,
            ColumnValues::UInt64(_) => DataType::UInt64,
            ColumnValues::Float64(_) => DataType::Float64,
            ColumnValues::Boolean(_) => DataType::Boolean,
            ColumnValues::Utf8(_) => DataType::Utf8,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Time(v) => v.len(),
            ColumnValues::Int64(v) => v.len(),
            ColumnValues::UInt64(v) => v.len(),
            ColumnValues::Float64(v) => v.len(),
            ColumnValues::Boolean(v) => v.len(),
            ColumnValues::Utf8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, idx: usize) -> Option<Scalar> {
        match self {
            ColumnValues::Time(v) => v.get(idx).map(|x| Scalar::Time(*x)),
            ColumnValues::Int64(v) => v.get(idx).map(|x| Scalar::I64(*x)),
            ColumnValues::UInt64(v) => v.get(idx).map(|x| Scalar::U64(*x)),
            ColumnValues::Float64(v) => v.get(idx).map(|x| Scalar::F64(*x)),
            ColumnValues::Boolean(v) => v.get(idx).map(|x| Scalar::Bool(*x)),
            ColumnValues::Utf8(v) => v.get(idx).map(|x| Scalar::Str(x.clone())),
        }
    }

    /// Append all values of `other`. Both sides must carry the same type.
    pub fn extend(&mut self, other: ColumnValues) -> Result<()> {
        match (self, other) {
            (ColumnValues::Time(a), ColumnValues::Time(b)) => a.extend(b),
            (ColumnValues::Int64(a), ColumnValues::Int64(b)) => a.extend(b),
            (ColumnValues::UInt64(a), ColumnValues::UInt64(b)) => a.extend(b),
            (ColumnValues::Float64(a), ColumnValues::Float64(b)) => a.extend(b),
            (ColumnValues::Boolean(a), ColumnValues::Boolean(b)) => a.extend(b),
            (ColumnValues::Utf8(a), ColumnValues::Utf8(b)) => a.extend(b),
            (a, b) => {
                return Err(Error::Schema(format!(
                    "cannot append {} values to a {} column",
                    b.data_type().name(),
                    a.data_type().name()
                )))
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

impl Column {
    pub fn new(name: impl Into<String>, values: ColumnValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn meta(&self) -> ColMeta {
        ColMeta::new(self.name.clone(), self.values.data_type())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A chunk of rows of one table. All columns have equal length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowBatch {
    pub columns: Vec<Column>,
}

impl RowBatch {
    /// A zero-row batch carrying the given columns.
    pub fn empty(cols: &[ColMeta]) -> Self {
        Self {
            columns: cols
                .iter()
                .map(|c| Column::new(c.label.clone(), ColumnValues::with_capacity(c.data_type, 0)))
                .collect(),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.columns.iter().map(Column::meta).collect())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Materialize row `idx` (mostly for tests and debugging).
    pub fn row(&self, idx: usize) -> Option<Vec<Scalar>> {
        if idx >= self.num_rows() {
            return None;
        }
        self.columns.iter().map(|c| c.values.get(idx)).collect()
    }

    /// Append `other` below `self`. Column names and types must line up.
    pub fn append(&mut self, other: RowBatch) -> Result<()> {
        if self.columns.len() != other.columns.len() {
            return Err(Error::Schema(format!(
                "column count mismatch: {} vs {}",
                self.columns.len(),
                other.columns.len()
            )));
        }
        for (dst, src) in self.columns.iter_mut().zip(other.columns) {
            if dst.name != src.name {
                return Err(Error::Schema(format!(
                    "column '{}' does not line up with '{}'",
                    src.name, dst.name
                )));
            }
            dst.values.extend(src.values)?;
        }
        Ok(())
    }
}

/// Assign a numeric order to scalar types for hashing.
pub(crate) fn scalar_type_order(s: &Scalar) -> u8 {
    use Scalar::*;
    match s {
        Null => 0,
        Time(_) => 1,
        I64(_) => 2,
        U64(_) => 3,
        F64(_) => 4,
        Bool(_) => 5,
        Str(_) => 6,
    }
}

/// Hash a scalar value into a hasher.
pub(crate) fn hash_scalar(scalar: &Scalar, hasher: &mut blake3::Hasher) {
    use Scalar::*;

    // Write type discriminant first
    hasher.update(&[scalar_type_order(scalar)]);

    match scalar {
        Null => {}
        Time(t) | I64(t) => {
            hasher.update(&t.to_le_bytes());
        }
        U64(u) => {
            hasher.update(&u.to_le_bytes());
        }
        F64(f) => {
            hasher.update(&f.to_bits().to_le_bytes());
        }
        Bool(b) => {
            hasher.update(&[*b as u8]);
        }
        Str(s) => {
            hasher.update(&(s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_col_batch(times: Vec<i64>, hosts: Vec<&str>) -> RowBatch {
        RowBatch {
            columns: vec![
                Column::new("_time", ColumnValues::Time(times)),
                Column::new(
                    "host",
                    ColumnValues::Utf8(hosts.into_iter().map(String::from).collect()),
                ),
            ],
        }
    }

    #[test]
    fn append_concatenates_matching_columns() {
        let mut a = two_col_batch(vec![1, 2], vec!["a", "a"]);
        a.append(two_col_batch(vec![3], vec!["b"])).unwrap();
        assert_eq!(a.num_rows(), 3);
        assert_eq!(
            a.row(2).unwrap(),
            vec![Scalar::Time(3), Scalar::Str("b".into())]
        );
    }

    #[test]
    fn append_rejects_type_mismatch() {
        let mut a = RowBatch {
            columns: vec![Column::new("_value", ColumnValues::Int64(vec![1]))],
        };
        let b = RowBatch {
            columns: vec![Column::new("_value", ColumnValues::Float64(vec![1.0]))],
        };
        let err = a.append(b).unwrap_err();
        assert!(err.to_string().contains("cannot append float values"));
    }

    #[test]
    fn empty_batch_keeps_schema() {
        let cols = vec![
            ColMeta::new("_time", DataType::Time),
            ColMeta::new("_value", DataType::Utf8),
        ];
        let batch = RowBatch::empty(&cols);
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.schema().columns, cols);
        assert!(batch.row(0).is_none());
    }
}
