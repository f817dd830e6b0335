use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum FlowshopError {
    #[error("schedule contains overlapping tasks {first} and {second}")]
    Overlap { first: String, second: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("index out of range: {0}")]
    Index(String),

    #[error("already a saved session with name {0}")]
    AlreadyExists(String),

    #[error("task {0} must end after it starts")]
    InvalidDuration(String),

    #[error("invalid session state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T, E = FlowshopError> = std::result::Result<T, E>;
