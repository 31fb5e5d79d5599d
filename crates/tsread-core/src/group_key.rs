//! Group keys: the columns + values identifying the partition a table belongs to.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::hash::{hash_group_key, Hash256};
use crate::schema::{ColMeta, DataType, DEFAULT_START_COL_LABEL, DEFAULT_STOP_COL_LABEL};
use crate::types::Scalar;

/// How a bounded read partitions its series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GroupMode {
    /// Same as `All`.
    #[default]
    Default,
    /// One partition holding every series.
    None,
    /// Partition by the listed keys.
    By,
    /// Partition by every key except the listed ones.
    Except,
    /// One table per series.
    All,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupKey {
    cols: Vec<ColMeta>,
    values: Vec<Scalar>,
}

impl GroupKey {
    /// `cols` and `values` are paired by position.
    pub fn new(cols: Vec<ColMeta>, values: Vec<Scalar>) -> Self {
        debug_assert_eq!(cols.len(), values.len(), "group key cols/values length");
        Self { cols, values }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A key holding only the `_start`/`_stop` bounds columns.
    pub fn from_bounds(bounds: &Bounds) -> Self {
        Self::new(
            vec![
                ColMeta::new(DEFAULT_START_COL_LABEL, DataType::Time),
                ColMeta::new(DEFAULT_STOP_COL_LABEL, DataType::Time),
            ],
            vec![Scalar::Time(bounds.start), Scalar::Time(bounds.stop)],
        )
    }

    pub fn push(&mut self, col: ColMeta, value: Scalar) {
        self.cols.push(col);
        self.values.push(value);
    }

    pub fn cols(&self) -> &[ColMeta] {
        &self.cols
    }

    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.cols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cols.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.cols.iter().map(|c| c.label.as_str()).collect()
    }

    pub fn value(&self, label: &str) -> Option<&Scalar> {
        self.cols
            .iter()
            .position(|c| c.label == label)
            .map(|i| &self.values[i])
    }

    /// Stable content hash; equal keys always hash equal.
    pub fn fingerprint(&self) -> Hash256 {
        hash_group_key(self)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (c, v)) in self.cols.iter().zip(&self.values).enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match v {
                Scalar::Null => write!(f, "{}=null", c.label)?,
                Scalar::Time(t) | Scalar::I64(t) => write!(f, "{}={}", c.label, t)?,
                Scalar::U64(u) => write!(f, "{}={}", c.label, u)?,
                Scalar::F64(x) => write!(f, "{}={}", c.label, x)?,
                Scalar::Bool(b) => write!(f, "{}={}", c.label, b)?,
                Scalar::Str(s) => write!(f, "{}={}", c.label, s)?,
            }
        }
        f.write_str("}")
    }
}
