//! Redis connection management.

use std::time::Duration;

use redis::aio::ConnectionManager;
use thiserror::Error;
use tracing::{info, warn};

/// Store error types.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Channel already exists: {0}")]
    AlreadyExists(String),

    #[error("{name} is not queued for channel {channel}")]
    NotFound { channel: String, name: String },

    #[error("Redis unavailable: {0}")]
    Unavailable(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl StoreError {
    /// Whether the error means "nothing there" rather than a storage failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ChannelNotFound(_) | Self::NotFound { .. })
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Redis connection pool — ConnectionManager handles multiplexing and
/// reconnects internally. It is Clone, so callers clone it per operation.
pub type RedisPool = ConnectionManager;

/// Bounded retry policy for the initial connection.
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions {
    pub max_attempts: u32,
    pub retry_interval: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_interval: Duration::from_secs(3),
        }
    }
}

/// Initialize a Redis connection pool from a URL.
///
/// The first connection is retried `max_attempts` times at a fixed interval
/// so the service can start alongside its database. Per-request operations
/// are never retried.
///
/// Example URL: `redis://127.0.0.1:6379`
pub async fn init_pool(redis_url: &str, options: ConnectOptions) -> StoreResult<RedisPool> {
    let client = redis::Client::open(redis_url)?;
    let mut attempt = 1;
    loop {
        match ConnectionManager::new(client.clone()).await {
            Ok(manager) => {
                info!(attempt, "Connected successfully to Redis");
                return Ok(manager);
            }
            Err(e) if attempt < options.max_attempts => {
                warn!(
                    attempt,
                    max_attempts = options.max_attempts,
                    error = %e,
                    "Redis connection failed, retrying"
                );
                attempt += 1;
                tokio::time::sleep(options.retry_interval).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
