use thiserror::Error;

use tsread_core::group_key::GroupMode;
use tsread_storage::StorageError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("core: {0}")]
    Core(String),

    #[error("table cancelled")]
    Cancelled,

    #[error("group mode {0:?} is not implemented")]
    UnsupportedGroupMode(GroupMode),

    #[error("table producer: {0}")]
    Producer(String),
}

impl From<tsread_core::Error> for TableError {
    fn from(e: tsread_core::Error) -> Self {
        TableError::Core(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TableError>;
