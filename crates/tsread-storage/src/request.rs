//! Request descriptors sent to the storage engine.

use serde::{Deserialize, Serialize};
use tsread_core::id::{BucketId, OrgId};

use crate::predicate::Predicate;

/// Points limit requesting series/group metadata only.
pub const NO_POINTS_LIMIT: i64 = -1;

/// Resolved storage location of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadSource {
    pub org_id: OrgId,
    pub bucket_id: BucketId,
}

/// `[start, end)` in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimestampRange {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Group {
    None,
    By,
    Except,
    #[default]
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AggregateType {
    #[default]
    None,
    Sum,
    Count,
    Min,
    Max,
    First,
    Last,
    Mean,
}

impl AggregateType {
    pub const ALL: [AggregateType; 8] = [
        AggregateType::None,
        AggregateType::Sum,
        AggregateType::Count,
        AggregateType::Min,
        AggregateType::Max,
        AggregateType::First,
        AggregateType::Last,
        AggregateType::Mean,
    ];

    /// Wire name of the variant.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            AggregateType::None => "NONE",
            AggregateType::Sum => "SUM",
            AggregateType::Count => "COUNT",
            AggregateType::Min => "MIN",
            AggregateType::Max => "MAX",
            AggregateType::First => "FIRST",
            AggregateType::Last => "LAST",
            AggregateType::Mean => "MEAN",
        }
    }

    /// Exact (case-sensitive) lookup by wire name.
    pub fn from_str_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str_name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub kind: AggregateType,
}

/// Bit set of storage hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadHints(u32);

impl ReadHints {
    pub const NO_POINTS: u32 = 1 << 0;

    pub fn set_no_points(&mut self) {
        self.0 |= Self::NO_POINTS;
    }

    pub fn no_points(&self) -> bool {
        self.0 & Self::NO_POINTS != 0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

/// Bounded, optionally grouped read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadRequest {
    pub read_source: ReadSource,
    pub predicate: Option<Predicate>,
    pub descending: bool,
    pub range: TimestampRange,
    pub group: Group,
    pub group_keys: Vec<String>,
    pub series_limit: i64,
    pub series_offset: i64,
    pub points_limit: i64,
    pub hints: ReadHints,
    pub aggregate: Option<Aggregate>,
}

impl ReadRequest {
    pub fn new(read_source: ReadSource, range: TimestampRange) -> Self {
        Self {
            read_source,
            predicate: None,
            descending: false,
            range,
            group: Group::All,
            group_keys: Vec::new(),
            series_limit: 0,
            series_offset: 0,
            points_limit: 0,
            hints: ReadHints::default(),
            aggregate: None,
        }
    }
}

/// Ungrouped read of every matching series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadFilterRequest {
    pub read_source: ReadSource,
    pub predicate: Option<Predicate>,
    pub range: TimestampRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagKeysRequest {
    pub tags_source: ReadSource,
    pub predicate: Option<Predicate>,
    pub range: TimestampRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagValuesRequest {
    pub tags_source: ReadSource,
    pub predicate: Option<Predicate>,
    pub range: TimestampRange,
    pub tag_key: String,
}
