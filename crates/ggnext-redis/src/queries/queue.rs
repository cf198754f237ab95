//! Channel queue queries — Redis implementation.
//!
//! A channel's queue is a Redis list of JSON-encoded entries. Channel
//! existence is tracked separately in a set because Redis deletes empty
//! lists, and an emptied channel must still exist.

use std::sync::LazyLock;

use redis::Script;
use tracing::{debug, info};

use super::{queue_key, CHANNELS_KEY};
use crate::client::{RedisPool, StoreError, StoreResult};
use crate::store::{AppendOutcome, QueueEntry};

// KEYS[1] = channel set, KEYS[2] = queue list
// ARGV[1] = channel, ARGV[2..] = encoded entries
static CREATE_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r#"
if redis.call('SADD', KEYS[1], ARGV[1]) == 0 then
  return 0
end
redis.call('DEL', KEYS[2])
for i = 2, #ARGV do
  redis.call('RPUSH', KEYS[2], ARGV[i])
end
return 1
"#,
    )
});

// ARGV[1] = channel, ARGV[2] = encoded entry
static APPEND_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r#"
if redis.call('SISMEMBER', KEYS[1], ARGV[1]) == 0 then
  return -1
end
return redis.call('RPUSH', KEYS[2], ARGV[2])
"#,
    )
});

// ARGV[1] = channel, ARGV[2] = entry name, ARGV[3] = encoded entry
// Reply: {1, new_length, created} or {0, existing_position}
static APPEND_UNIQUE_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r#"
local created = redis.call('SADD', KEYS[1], ARGV[1])
local items = redis.call('LRANGE', KEYS[2], 0, -1)
for i, raw in ipairs(items) do
  local ok, entry = pcall(cjson.decode, raw)
  if ok and entry['name'] == ARGV[2] then
    return {0, i}
  end
end
local len = redis.call('RPUSH', KEYS[2], ARGV[3])
return {1, len, created}
"#,
    )
});

// ARGV[1] = channel, ARGV[2] = entry name
// Reply: 1 removed, 0 name not queued, -1 channel missing
static REMOVE_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r#"
if redis.call('SISMEMBER', KEYS[1], ARGV[1]) == 0 then
  return -1
end
local items = redis.call('LRANGE', KEYS[2], 0, -1)
for _, raw in ipairs(items) do
  local ok, entry = pcall(cjson.decode, raw)
  if ok and entry['name'] == ARGV[2] then
    redis.call('LREM', KEYS[2], 1, raw)
    return 1
  end
end
return 0
"#,
    )
});

// ─────────────────────────────── READS ─────────────────────────────────

pub async fn get_queue(pool: &RedisPool, channel: &str) -> StoreResult<Vec<QueueEntry>> {
    let mut conn = pool.clone();
    let (known, raw): (bool, Vec<String>) = redis::pipe()
        .atomic()
        .sismember(CHANNELS_KEY, channel)
        .lrange(queue_key(channel), 0, -1)
        .query_async(&mut conn)
        .await?;
    if !known {
        return Err(StoreError::ChannelNotFound(channel.to_string()));
    }
    raw.iter()
        .map(|j| serde_json::from_str(j).map_err(StoreError::from))
        .collect()
}

// ─────────────────────────────── WRITES ────────────────────────────────

pub async fn create_channel(
    pool: &RedisPool,
    channel: &str,
    entries: &[QueueEntry],
) -> StoreResult<()> {
    let mut invocation = CREATE_SCRIPT.key(CHANNELS_KEY);
    invocation.key(queue_key(channel)).arg(channel);
    for entry in entries {
        invocation.arg(serde_json::to_string(entry)?);
    }
    let mut conn = pool.clone();
    let created: i64 = invocation.invoke_async(&mut conn).await?;
    if created == 0 {
        return Err(StoreError::AlreadyExists(channel.to_string()));
    }
    info!(channel = %channel, entries = entries.len(), "Created channel");
    Ok(())
}

pub async fn append_entry(pool: &RedisPool, channel: &str, entry: &QueueEntry) -> StoreResult<usize> {
    let mut invocation = APPEND_SCRIPT.key(CHANNELS_KEY);
    invocation
        .key(queue_key(channel))
        .arg(channel)
        .arg(serde_json::to_string(entry)?);
    let mut conn = pool.clone();
    let len: i64 = invocation.invoke_async(&mut conn).await?;
    if len < 0 {
        return Err(StoreError::ChannelNotFound(channel.to_string()));
    }
    Ok(len as usize)
}

pub async fn append_unique(
    pool: &RedisPool,
    channel: &str,
    entry: &QueueEntry,
) -> StoreResult<AppendOutcome> {
    let mut invocation = APPEND_UNIQUE_SCRIPT.key(CHANNELS_KEY);
    invocation
        .key(queue_key(channel))
        .arg(channel)
        .arg(&entry.name)
        .arg(serde_json::to_string(entry)?);
    let mut conn = pool.clone();
    let reply: Vec<i64> = invocation.invoke_async(&mut conn).await?;
    decode_append_reply(&reply)
}

pub async fn remove_entry(pool: &RedisPool, channel: &str, name: &str) -> StoreResult<()> {
    let mut invocation = REMOVE_SCRIPT.key(CHANNELS_KEY);
    invocation.key(queue_key(channel)).arg(channel).arg(name);
    let mut conn = pool.clone();
    let removed: i64 = invocation.invoke_async(&mut conn).await?;
    match removed {
        1 => Ok(()),
        -1 => {
            debug!(channel = %channel, name = %name, "Remove from unknown channel");
            Err(StoreError::NotFound {
                channel: channel.to_string(),
                name: name.to_string(),
            })
        }
        _ => Err(StoreError::NotFound {
            channel: channel.to_string(),
            name: name.to_string(),
        }),
    }
}

/// Interpret the compare-and-append script reply.
pub(crate) fn decode_append_reply(reply: &[i64]) -> StoreResult<AppendOutcome> {
    match reply {
        [1, len, created] if *len > 0 => Ok(AppendOutcome::Appended {
            position: *len as usize,
            created: *created == 1,
        }),
        [0, position] if *position > 0 => Ok(AppendOutcome::AlreadyQueued {
            position: *position as usize,
        }),
        other => Err(StoreError::OperationFailed(format!(
            "unexpected append reply: {:?}",
            other
        ))),
    }
}
