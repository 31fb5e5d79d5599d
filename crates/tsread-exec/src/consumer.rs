//! Consumers receive each delivered table, in iteration order.

use async_trait::async_trait;
use tsread_core::group_key::GroupKey;
use tsread_core::types::RowBatch;
use tsread_table::ReadTable;

use crate::error::Result;

/// Receives ownership of every table a read delivers.
///
/// The read waits for the producer of a table to finish only after
/// `consume` returns, so a consumer should read the table to its end (or
/// drop it) before returning.
#[async_trait]
pub trait TableConsumer: Send {
    async fn consume(&mut self, table: ReadTable) -> Result<()>;
}

/// A fully read table.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedTable {
    pub key: GroupKey,
    pub rows: RowBatch,
}

/// Materializes every delivered table.
#[derive(Debug, Default)]
pub struct TableCollector {
    tables: Vec<CollectedTable>,
}

impl TableCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tables(&self) -> &[CollectedTable] {
        &self.tables
    }

    pub fn into_tables(self) -> Vec<CollectedTable> {
        self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[async_trait]
impl TableConsumer for TableCollector {
    async fn consume(&mut self, table: ReadTable) -> Result<()> {
        let key = table.key().clone();
        let rows = table.collect().await?;
        self.tables.push(CollectedTable { key, rows });
        Ok(())
    }
}
