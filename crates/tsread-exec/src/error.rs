use thiserror::Error;

use tsread_storage::{PredicateError, StorageError};
use tsread_table::TableError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("predicate: {0}")]
    Predicate(#[from] PredicateError),

    #[error("unknown aggregate method {0:?}")]
    UnknownAggregate(String),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("table: {0}")]
    Table(TableError),

    #[error("config: {0}")]
    Config(String),

    #[error("consumer: {0}")]
    Consumer(#[source] BoxError),
}

impl ReadError {
    /// Wrap a consumer-side failure.
    pub fn consumer(err: impl Into<BoxError>) -> Self {
        ReadError::Consumer(err.into())
    }
}

impl From<TableError> for ReadError {
    fn from(e: TableError) -> Self {
        match e {
            TableError::Storage(e) => ReadError::Storage(e),
            other => ReadError::Table(other),
        }
    }
}

impl From<tsread_core::Error> for ReadError {
    fn from(e: tsread_core::Error) -> Self {
        ReadError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_failures_inside_tables_surface_as_storage() {
        let err: ReadError = TableError::Storage(StorageError::Engine("down".into())).into();
        assert!(matches!(err, ReadError::Storage(StorageError::Engine(ref m)) if m == "down"));

        let err: ReadError = TableError::Cancelled.into();
        assert!(matches!(err, ReadError::Table(TableError::Cancelled)));
    }

    #[test]
    fn consumer_errors_keep_their_message() {
        let err = ReadError::consumer("sink full");
        assert_eq!(err.to_string(), "consumer: sink full");
    }
}
