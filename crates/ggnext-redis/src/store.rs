//! Queue store contract and its Redis-backed implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::{init_pool, ConnectOptions, RedisPool, StoreResult};
use crate::queries::{api_keys, queue};

/// One challenger waiting in a channel's queue.
///
/// Identity fields beyond `name`, `displayName` and `friendCode` are carried
/// through untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub friend_code: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl QueueEntry {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            friend_code: String::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_friend_code(mut self, friend_code: impl Into<String>) -> Self {
        self.friend_code = friend_code.into();
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Result of a compare-and-append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The entry was added at `position` (1-based). `created` is set when this
    /// append created the channel.
    Appended { position: usize, created: bool },
    /// An entry with the same name is already queued at `position`.
    AlreadyQueued { position: usize },
}

/// Durable per-channel queue storage.
///
/// Mutations of a single channel are linearizable; different channels are
/// independent of each other.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Full ordered queue, or `ChannelNotFound`.
    async fn get(&self, channel: &str) -> StoreResult<Vec<QueueEntry>>;

    /// Create a channel with an initial queue, or `AlreadyExists`.
    async fn create(&self, channel: &str, entries: &[QueueEntry]) -> StoreResult<()>;

    /// Append to an existing channel and return the new queue length.
    async fn append(&self, channel: &str, entry: &QueueEntry) -> StoreResult<usize>;

    /// Remove the entry called `name`. `NotFound` covers both a missing
    /// channel and a name that is not queued.
    async fn remove_by_name(&self, channel: &str, name: &str) -> StoreResult<()>;

    /// Atomically append `entry` unless its name is already queued, creating
    /// the channel if it does not exist yet.
    async fn append_unique(&self, channel: &str, entry: &QueueEntry) -> StoreResult<AppendOutcome>;

    /// Channels an API key may act for, or `None` for an unknown key.
    async fn channels_for_key(&self, api_key: &str) -> StoreResult<Option<Vec<String>>>;

    /// Allow `api_key` to act for `channels` (additive).
    async fn grant_key(&self, api_key: &str, channels: &[String]) -> StoreResult<()>;

    /// Forget an API key entirely. Returns whether it existed.
    async fn revoke_key(&self, api_key: &str) -> StoreResult<bool>;
}

/// Redis implementation of [`QueueStore`].
#[derive(Clone)]
pub struct RedisQueueStore {
    pool: RedisPool,
}

impl RedisQueueStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Connect with the bounded startup retry policy.
    pub async fn connect(redis_url: &str, options: ConnectOptions) -> StoreResult<Self> {
        Ok(Self::new(init_pool(redis_url, options).await?))
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn get(&self, channel: &str) -> StoreResult<Vec<QueueEntry>> {
        queue::get_queue(&self.pool, channel).await
    }

    async fn create(&self, channel: &str, entries: &[QueueEntry]) -> StoreResult<()> {
        queue::create_channel(&self.pool, channel, entries).await
    }

    async fn append(&self, channel: &str, entry: &QueueEntry) -> StoreResult<usize> {
        queue::append_entry(&self.pool, channel, entry).await
    }

    async fn remove_by_name(&self, channel: &str, name: &str) -> StoreResult<()> {
        queue::remove_entry(&self.pool, channel, name).await
    }

    async fn append_unique(&self, channel: &str, entry: &QueueEntry) -> StoreResult<AppendOutcome> {
        queue::append_unique(&self.pool, channel, entry).await
    }

    async fn channels_for_key(&self, api_key: &str) -> StoreResult<Option<Vec<String>>> {
        api_keys::channels_for_key(&self.pool, api_key).await
    }

    async fn grant_key(&self, api_key: &str, channels: &[String]) -> StoreResult<()> {
        api_keys::grant_key(&self.pool, api_key, channels).await
    }

    async fn revoke_key(&self, api_key: &str) -> StoreResult<bool> {
        api_keys::revoke_key(&self.pool, api_key).await
    }
}
