//! Column schema of the tables handed to the query engine. Pure data.
//!
//! Every table starts with the same four columns; see the `*_COL_LABEL`
//! constants. Tag and group-key columns follow, always as `Utf8`.

use serde::{Deserialize, Serialize};

pub const DEFAULT_START_COL_LABEL: &str = "_start";
pub const DEFAULT_STOP_COL_LABEL: &str = "_stop";
pub const DEFAULT_TIME_COL_LABEL: &str = "_time";
pub const DEFAULT_VALUE_COL_LABEL: &str = "_value";

pub const START_COL_IDX: usize = 0;
pub const STOP_COL_IDX: usize = 1;
pub const TIME_COL_IDX: usize = 2;
pub const VALUE_COL_IDX: usize = 3;

/// Number of fixed columns preceding the tag columns.
pub const FIXED_COLS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Nanosecond timestamp.
    Time,
    Int64,
    UInt64,
    Float64,
    Boolean,
    Utf8,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Time => "time",
            DataType::Int64 => "int",
            DataType::UInt64 => "uint",
            DataType::Float64 => "float",
            DataType::Boolean => "bool",
            DataType::Utf8 => "string",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColMeta {
    pub label: String,
    pub data_type: DataType,
}

impl ColMeta {
    pub fn new(label: impl Into<String>, data_type: DataType) -> Self {
        Self {
            label: label.into(),
            data_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<ColMeta>,
}

impl Schema {
    pub fn new(columns: Vec<ColMeta>) -> Self {
        Self { columns }
    }

    pub fn column(&self, idx: usize) -> Option<&ColMeta> {
        self.columns.get(idx)
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.label == label)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label.as_str()).collect()
    }
}
