use thiserror::Error;

/// Result type local to tsread-storage.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Failures reported by the storage engine. Cloneable so a result set can
/// hand out its sticky error more than once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage engine error: {0}")]
    Engine(String),

    #[error("cursor error: {0}")]
    Cursor(String),

    #[error("unsupported request: {0}")]
    Unsupported(String),

    #[error("request cancelled")]
    Cancelled,
}
