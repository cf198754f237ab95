//! ggNext Redis Data Layer
//!
//! Durable per-channel challenger queues and API keys.
//! Every mutation of a channel runs as a single server-side script, so
//! concurrent writers to the same channel never lose updates.

pub mod client;
pub mod memory;
pub mod queries;
pub mod store;

pub use client::{init_pool, ConnectOptions, RedisPool, StoreError, StoreResult};
pub use memory::MemoryQueueStore;
pub use store::{AppendOutcome, QueueEntry, QueueStore, RedisQueueStore};
