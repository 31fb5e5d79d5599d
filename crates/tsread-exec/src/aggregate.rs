//! Aggregate-method names and grouping modes as the storage engine knows them.

use tsread_core::group_key::GroupMode;
use tsread_storage::{AggregateType, Group};

use crate::error::{ReadError, Result};

/// Resolve an aggregate-method name, ignoring case. An empty name means no
/// aggregation; an unknown one is an error.
pub fn determine_aggregate_method(name: &str) -> Result<AggregateType> {
    if name.is_empty() {
        return Ok(AggregateType::None);
    }
    AggregateType::from_str_name(&name.to_uppercase())
        .ok_or_else(|| ReadError::UnknownAggregate(name.to_string()))
}

pub fn convert_group_mode(mode: GroupMode) -> Group {
    match mode {
        GroupMode::Default | GroupMode::All => Group::All,
        GroupMode::None => Group::None,
        GroupMode::By => Group::By,
        GroupMode::Except => Group::Except,
    }
}
