//! Centralized error types for queue operations.

use ggnext_redis::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{name} is not queued for channel {channel}")]
    NotFound { channel: String, name: String },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[source] StoreError),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { channel, name } => Self::NotFound { channel, name },
            other => Self::StorageUnavailable(other),
        }
    }
}
