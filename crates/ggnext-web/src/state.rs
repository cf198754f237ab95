//! Application state.

use std::sync::Arc;

use ggnext_core::{BroadcastConfig, Broadcaster, QueueService};
use ggnext_redis::QueueStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub queue: QueueService,
}

impl AppState {
    pub fn new(store: Arc<dyn QueueStore>, config: BroadcastConfig) -> Self {
        let broadcaster = Arc::new(Broadcaster::new(config));
        Self {
            queue: QueueService::new(store, broadcaster),
        }
    }

    pub fn store(&self) -> &Arc<dyn QueueStore> {
        self.queue.store()
    }
}
