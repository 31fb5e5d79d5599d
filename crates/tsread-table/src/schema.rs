//! Column lists and group keys of the tables built from storage cursors.
//!
//! Every table has `_start`, `_stop`, `_time` and `_value` first. Series
//! tables add one string column per tag, in the series' tag order. Group
//! tables add one string column per group key of the partition.

use tsread_core::bounds::Bounds;
use tsread_core::group_key::{GroupKey, GroupMode};
use tsread_core::schema::{
    ColMeta, DataType, DEFAULT_START_COL_LABEL, DEFAULT_STOP_COL_LABEL, DEFAULT_TIME_COL_LABEL,
    DEFAULT_VALUE_COL_LABEL, FIXED_COLS,
};
use tsread_core::types::Scalar;
use tsread_storage::Tags;

use crate::error::{Result, TableError};

/// Columns of one table and the value each column takes when a series has
/// nothing for it. Fixed columns have no default.
#[derive(Debug, Clone, PartialEq)]
pub struct TableColumns {
    pub cols: Vec<ColMeta>,
    pub defaults: Vec<Option<Scalar>>,
}

impl TableColumns {
    fn with_tag_columns<'a>(value_type: DataType, labels: impl Iterator<Item = &'a str>) -> Self {
        let mut cols = fixed_cols(value_type);
        let mut defaults = vec![None; FIXED_COLS];
        for label in labels {
            cols.push(ColMeta::new(label, DataType::Utf8));
            defaults.push(Some(Scalar::Str(String::new())));
        }
        Self { cols, defaults }
    }

    /// Labels of the string columns following the fixed ones.
    pub fn tag_labels(&self) -> impl Iterator<Item = &str> {
        self.cols[FIXED_COLS..].iter().map(|c| c.label.as_str())
    }

    /// Values of the tag columns for one series: the series' tag when it has
    /// one, the column default otherwise.
    pub fn tag_values(&self, tags: &Tags) -> Vec<String> {
        self.tag_labels()
            .zip(&self.defaults[FIXED_COLS..])
            .map(|(label, default)| match tags.get(label) {
                Some(v) => v.to_string(),
                None => default
                    .as_ref()
                    .and_then(Scalar::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect()
    }
}

fn fixed_cols(value_type: DataType) -> Vec<ColMeta> {
    vec![
        ColMeta::new(DEFAULT_START_COL_LABEL, DataType::Time),
        ColMeta::new(DEFAULT_STOP_COL_LABEL, DataType::Time),
        ColMeta::new(DEFAULT_TIME_COL_LABEL, DataType::Time),
        ColMeta::new(DEFAULT_VALUE_COL_LABEL, value_type),
    ]
}

pub fn determine_table_cols_for_series(tags: &Tags, value_type: DataType) -> TableColumns {
    TableColumns::with_tag_columns(value_type, tags.keys())
}

pub fn determine_table_cols_for_group(keys: &[String], value_type: DataType) -> TableColumns {
    TableColumns::with_tag_columns(value_type, keys.iter().map(String::as_str))
}

/// Bounds plus every tag of the series, in series order.
pub fn default_group_key_for_series(tags: &Tags, bounds: &Bounds) -> GroupKey {
    let mut key = GroupKey::from_bounds(bounds);
    for tag in tags {
        key.push(
            ColMeta::new(tag.key.clone(), DataType::Utf8),
            Scalar::Str(tag.value.clone()),
        );
    }
    key
}

/// Group key of a series-level table under `mode`.
///
/// `By` keeps the declared keys the series actually has (non-empty value),
/// in declared order. `Except` is not implemented and fails.
pub fn group_key_for_series(
    tags: &Tags,
    mode: GroupMode,
    group_keys: &[String],
    bounds: &Bounds,
) -> Result<GroupKey> {
    match mode {
        GroupMode::None => Ok(GroupKey::from_bounds(bounds)),
        GroupMode::By => {
            let mut key = GroupKey::from_bounds(bounds);
            for label in group_keys {
                if let Some(v) = tags.get(label).filter(|v| !v.is_empty()) {
                    key.push(
                        ColMeta::new(label.clone(), DataType::Utf8),
                        Scalar::Str(v.to_string()),
                    );
                }
            }
            Ok(key)
        }
        GroupMode::Except => Err(TableError::UnsupportedGroupMode(mode)),
        GroupMode::Default | GroupMode::All => Ok(default_group_key_for_series(tags, bounds)),
    }
}

/// Group key of a partition: bounds plus one entry per declared key, taking
/// the value at the same index of `kv`. `_start`/`_stop` labels are skipped
/// since the bounds already cover them.
pub fn group_key_for_group(kv: &[String], group_keys: &[String], bounds: &Bounds) -> GroupKey {
    let mut key = GroupKey::from_bounds(bounds);
    for (i, label) in group_keys.iter().enumerate() {
        if label == DEFAULT_START_COL_LABEL || label == DEFAULT_STOP_COL_LABEL {
            continue;
        }
        let value = kv.get(i).cloned().unwrap_or_default();
        key.push(ColMeta::new(label.clone(), DataType::Utf8), Scalar::Str(value));
    }
    key
}
