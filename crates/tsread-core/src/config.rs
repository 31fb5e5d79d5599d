//! Reader configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Row chunks a table producer may buffer ahead of its consumer.
    /// Must be at least 1.
    pub table_buffer: usize,

    /// Initial capacity of the string column built by tag-keys/tag-values reads.
    pub tag_values_capacity: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            table_buffer: 4,
            tag_values_capacity: 64,
        }
    }
}

impl ReaderConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `TSREAD_TABLE_BUFFER`: chunks buffered per table
    /// - `TSREAD_TAG_VALUES_CAPACITY`: initial tag-values column capacity
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = lookup("TSREAD_TABLE_BUFFER").and_then(|s| s.parse::<usize>().ok()) {
            cfg.table_buffer = v;
        }

        if let Some(v) = lookup("TSREAD_TAG_VALUES_CAPACITY").and_then(|s| s.parse::<usize>().ok())
        {
            cfg.tag_values_capacity = v;
        }

        cfg
    }

    pub fn validate(&self) -> Result<()> {
        if self.table_buffer == 0 {
            return Err(Error::Config("table_buffer must be at least 1".into()));
        }
        Ok(())
    }

    pub fn with_table_buffer(mut self, table_buffer: usize) -> Self {
        self.table_buffer = table_buffer;
        self
    }
}
