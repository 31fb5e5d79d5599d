//! What the query engine asks for. One descriptor per read call; time bounds
//! are passed alongside.

use serde::{Deserialize, Serialize};
use tsread_core::group_key::GroupMode;
use tsread_core::id::{BucketId, OrgId};
use tsread_storage::NO_POINTS_LIMIT;

/// Bounded, optionally grouped read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadSpec<E> {
    pub org_id: OrgId,
    pub bucket_id: BucketId,
    pub predicate: Option<E>,
    pub group_mode: GroupMode,
    pub group_keys: Vec<String>,
    /// 0 means no limit.
    pub series_limit: i64,
    pub series_offset: i64,
    /// 0 means no limit, `-1` means metadata only.
    pub points_limit: i64,
    pub descending: bool,
    /// Case-insensitive; empty means no aggregation.
    pub aggregate_method: String,
}

impl<E> ReadSpec<E> {
    pub fn new(org_id: OrgId, bucket_id: BucketId) -> Self {
        Self {
            org_id,
            bucket_id,
            predicate: None,
            group_mode: GroupMode::Default,
            group_keys: Vec::new(),
            series_limit: 0,
            series_offset: 0,
            points_limit: 0,
            descending: false,
            aggregate_method: String::new(),
        }
    }

    pub fn with_predicate(mut self, predicate: E) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_group(mut self, mode: GroupMode, keys: &[&str]) -> Self {
        self.group_mode = mode;
        self.group_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_aggregate(mut self, method: impl Into<String>) -> Self {
        self.aggregate_method = method.into();
        self
    }

    /// Ask for series/group metadata only.
    pub fn no_points(mut self) -> Self {
        self.points_limit = NO_POINTS_LIMIT;
        self
    }

    pub fn is_no_points(&self) -> bool {
        self.points_limit == NO_POINTS_LIMIT
    }
}

/// Ungrouped read: one table per series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadFilterSpec<E> {
    pub org_id: OrgId,
    pub bucket_id: BucketId,
    pub predicate: Option<E>,
}

impl<E> ReadFilterSpec<E> {
    pub fn new(org_id: OrgId, bucket_id: BucketId) -> Self {
        Self {
            org_id,
            bucket_id,
            predicate: None,
        }
    }

    pub fn with_predicate(mut self, predicate: E) -> Self {
        self.predicate = Some(predicate);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadTagKeysSpec<E> {
    pub org_id: OrgId,
    pub bucket_id: BucketId,
    pub predicate: Option<E>,
}

impl<E> ReadTagKeysSpec<E> {
    pub fn new(org_id: OrgId, bucket_id: BucketId) -> Self {
        Self {
            org_id,
            bucket_id,
            predicate: None,
        }
    }

    pub fn with_predicate(mut self, predicate: E) -> Self {
        self.predicate = Some(predicate);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadTagValuesSpec<E> {
    pub org_id: OrgId,
    pub bucket_id: BucketId,
    pub predicate: Option<E>,
    /// `_measurement` and `_field` are translated to the engine's reserved keys.
    pub tag_key: String,
}

impl<E> ReadTagValuesSpec<E> {
    pub fn new(org_id: OrgId, bucket_id: BucketId, tag_key: impl Into<String>) -> Self {
        Self {
            org_id,
            bucket_id,
            predicate: None,
            tag_key: tag_key.into(),
        }
    }

    pub fn with_predicate(mut self, predicate: E) -> Self {
        self.predicate = Some(predicate);
        self
    }
}
