//! API key queries — Redis implementation.
//!
//! Each key is a set of the channels it may act for.

use redis::AsyncCommands;
use tracing::info;

use super::api_key_key;
use crate::client::{RedisPool, StoreResult};

pub async fn channels_for_key(pool: &RedisPool, api_key: &str) -> StoreResult<Option<Vec<String>>> {
    let mut conn = pool.clone();
    let mut channels: Vec<String> = conn.smembers(api_key_key(api_key)).await?;
    if channels.is_empty() {
        return Ok(None);
    }
    channels.sort();
    Ok(Some(channels))
}

pub async fn grant_key(pool: &RedisPool, api_key: &str, channels: &[String]) -> StoreResult<()> {
    if channels.is_empty() {
        return Ok(());
    }
    let mut conn = pool.clone();
    conn.sadd::<_, _, ()>(api_key_key(api_key), channels).await?;
    info!(channels = ?channels, "Granted API key");
    Ok(())
}

pub async fn revoke_key(pool: &RedisPool, api_key: &str) -> StoreResult<bool> {
    let mut conn = pool.clone();
    let removed: i64 = conn.del(api_key_key(api_key)).await?;
    Ok(removed > 0)
}
