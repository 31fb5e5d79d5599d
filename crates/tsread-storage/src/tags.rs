//! Series identity: the ordered tag set supplied by the storage engine.

use serde::{Deserialize, Serialize};

/// Internal key of the measurement tag.
pub const MEASUREMENT_TAG_KEY: &str = "\x00";
/// Internal key of the field tag.
pub const FIELD_KEY_TAG_KEY: &str = "\u{ff}";
/// Query-facing alias of [`MEASUREMENT_TAG_KEY`].
pub const MEASUREMENT_ALIAS: &str = "_measurement";
/// Query-facing alias of [`FIELD_KEY_TAG_KEY`].
pub const FIELD_ALIAS: &str = "_field";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Ordered tags. Order and uniqueness are whatever the engine supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<Tag>);

impl Tags {
    pub fn new(tags: Vec<Tag>) -> Self {
        Self(tags)
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self(pairs.iter().map(|(k, v)| Tag::new(*k, *v)).collect())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|t| t.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Tags {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
