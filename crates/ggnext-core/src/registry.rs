//! Subscriber registry.
//!
//! Maps each channel to the live connections watching it. Every channel has
//! its own bucket mutex, so connects and disconnects on different channels do
//! not contend. Bucket locks are never held across an await.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::event::QueueEvent;

/// Identity of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outbound side of one connection.
#[derive(Clone, Debug)]
pub struct Subscriber {
    pub id: ConnectionId,
    pub tx: mpsc::Sender<QueueEvent>,
}

type Bucket = Arc<Mutex<Vec<Subscriber>>>;

#[derive(Default)]
pub struct SubscriberRegistry {
    channels: RwLock<HashMap<String, Bucket>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for a channel. Registering the same id twice is
    /// a no-op.
    pub fn subscribe(&self, channel: &str, subscriber: Subscriber) {
        // The push happens under the outer read lock so that an empty bucket
        // cannot be dropped between lookup and insert.
        {
            let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(bucket) = channels.get(channel) {
                push_unique(bucket, subscriber);
                return;
            }
        }
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        let bucket = channels.entry(channel.to_string()).or_default();
        push_unique(bucket, subscriber);
    }

    /// Remove a connection. Returns whether it was registered.
    pub fn unsubscribe(&self, channel: &str, id: ConnectionId) -> bool {
        let (removed, now_empty) = {
            let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
            let Some(bucket) = channels.get(channel) else {
                return false;
            };
            let mut subscribers = bucket.lock().unwrap_or_else(PoisonError::into_inner);
            let before = subscribers.len();
            subscribers.retain(|s| s.id != id);
            (subscribers.len() != before, subscribers.is_empty())
        };

        if now_empty {
            let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
            let still_empty = channels
                .get(channel)
                .map(|bucket| bucket.lock().unwrap_or_else(PoisonError::into_inner).is_empty())
                .unwrap_or(false);
            if still_empty {
                channels.remove(channel);
            }
        }
        removed
    }

    /// Current subscribers of a channel, in registration order. Delivery
    /// happens on this copy, outside any lock.
    pub fn subscribers(&self, channel: &str) -> Vec<Subscriber> {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        channels
            .get(channel)
            .map(|bucket| bucket.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        channels
            .get(channel)
            .map(|bucket| bucket.lock().unwrap_or_else(PoisonError::into_inner).len())
            .unwrap_or(0)
    }

    /// Number of channels with at least one subscriber.
    pub fn channel_count(&self) -> usize {
        self.channels.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drop every registration, closing all outbound queues. Returns how many
    /// connections were removed.
    pub fn clear(&self) -> usize {
        let drained: Vec<Bucket> = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, bucket)| bucket)
            .collect();
        drained
            .iter()
            .map(|bucket| {
                let mut subscribers = bucket.lock().unwrap_or_else(PoisonError::into_inner);
                let count = subscribers.len();
                subscribers.clear();
                count
            })
            .sum()
    }
}

fn push_unique(bucket: &Bucket, subscriber: Subscriber) {
    let mut subscribers = bucket.lock().unwrap_or_else(PoisonError::into_inner);
    if !subscribers.iter().any(|s| s.id == subscriber.id) {
        subscribers.push(subscriber);
    }
}
