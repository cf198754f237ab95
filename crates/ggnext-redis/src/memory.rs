//! In-process queue store.
//!
//! Used for tests and for running a single node without Redis. Each channel
//! owns its own mutex; the outer map lock is only held to find or insert a
//! channel, never while a queue is being scanned.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::info;

use crate::client::{StoreError, StoreResult};
use crate::store::{AppendOutcome, QueueEntry, QueueStore};

type ChannelQueue = Arc<Mutex<Vec<QueueEntry>>>;

#[derive(Default)]
pub struct MemoryQueueStore {
    channels: RwLock<HashMap<String, ChannelQueue>>,
    api_keys: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn channel(&self, channel: &str) -> Option<ChannelQueue> {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(channel)
            .cloned()
    }

    /// Returns the channel queue and whether this call created it.
    fn channel_or_create(&self, channel: &str) -> (ChannelQueue, bool) {
        if let Some(queue) = self.channel(channel) {
            return (queue, false);
        }
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        match channels.get(channel) {
            Some(queue) => (queue.clone(), false),
            None => {
                let queue = ChannelQueue::default();
                channels.insert(channel.to_string(), queue.clone());
                (queue, true)
            }
        }
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn get(&self, channel: &str) -> StoreResult<Vec<QueueEntry>> {
        let queue = self
            .channel(channel)
            .ok_or_else(|| StoreError::ChannelNotFound(channel.to_string()))?;
        let entries = queue.lock().unwrap_or_else(PoisonError::into_inner).clone();
        Ok(entries)
    }

    async fn create(&self, channel: &str, entries: &[QueueEntry]) -> StoreResult<()> {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        if channels.contains_key(channel) {
            return Err(StoreError::AlreadyExists(channel.to_string()));
        }
        channels.insert(channel.to_string(), Arc::new(Mutex::new(entries.to_vec())));
        info!(channel = %channel, entries = entries.len(), "Created channel");
        Ok(())
    }

    async fn append(&self, channel: &str, entry: &QueueEntry) -> StoreResult<usize> {
        let queue = self
            .channel(channel)
            .ok_or_else(|| StoreError::ChannelNotFound(channel.to_string()))?;
        let mut queue = queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.push(entry.clone());
        Ok(queue.len())
    }

    async fn remove_by_name(&self, channel: &str, name: &str) -> StoreResult<()> {
        let not_found = || StoreError::NotFound {
            channel: channel.to_string(),
            name: name.to_string(),
        };
        let queue = self.channel(channel).ok_or_else(not_found)?;
        let mut queue = queue.lock().unwrap_or_else(PoisonError::into_inner);
        let index = queue
            .iter()
            .position(|entry| entry.name == name)
            .ok_or_else(not_found)?;
        queue.remove(index);
        Ok(())
    }

    async fn append_unique(&self, channel: &str, entry: &QueueEntry) -> StoreResult<AppendOutcome> {
        let (queue, created) = self.channel_or_create(channel);
        let mut queue = queue.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(index) = queue.iter().position(|queued| queued.name == entry.name) {
            return Ok(AppendOutcome::AlreadyQueued { position: index + 1 });
        }
        queue.push(entry.clone());
        Ok(AppendOutcome::Appended {
            position: queue.len(),
            created,
        })
    }

    async fn channels_for_key(&self, api_key: &str) -> StoreResult<Option<Vec<String>>> {
        let keys = self.api_keys.read().unwrap_or_else(PoisonError::into_inner);
        Ok(keys
            .get(api_key)
            .map(|channels| channels.iter().cloned().collect()))
    }

    async fn grant_key(&self, api_key: &str, channels: &[String]) -> StoreResult<()> {
        if channels.is_empty() {
            return Ok(());
        }
        let mut keys = self.api_keys.write().unwrap_or_else(PoisonError::into_inner);
        keys.entry(api_key.to_string())
            .or_default()
            .extend(channels.iter().cloned());
        Ok(())
    }

    async fn revoke_key(&self, api_key: &str) -> StoreResult<bool> {
        let mut keys = self.api_keys.write().unwrap_or_else(PoisonError::into_inner);
        Ok(keys.remove(api_key).is_some())
    }
}
