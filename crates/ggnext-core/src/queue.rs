//! Queue service: challenger rules on top of the store.

use std::sync::Arc;

use tracing::{debug, info};

use ggnext_redis::{AppendOutcome, QueueEntry, QueueStore, StoreError};

use crate::broadcast::{Broadcaster, Subscription};
use crate::error::{CoreError, CoreResult};
use crate::event::QueueEvent;

/// Result of a challenge request.
#[derive(Debug, Clone, PartialEq)]
pub enum ChallengeOutcome {
    /// Added at this 1-based position.
    Queued { position: usize },
    /// Already waiting; nothing changed.
    AlreadyQueued { entrant: QueueEntry },
}

/// Result of a position lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionOutcome {
    Position(usize),
    NotQueued,
}

#[derive(Clone)]
pub struct QueueService {
    store: Arc<dyn QueueStore>,
    broadcaster: Arc<Broadcaster>,
}

impl QueueService {
    pub fn new(store: Arc<dyn QueueStore>, broadcaster: Arc<Broadcaster>) -> Self {
        Self { store, broadcaster }
    }

    pub fn store(&self) -> &Arc<dyn QueueStore> {
        &self.store
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    /// Queue `entrant` for `channel`, creating the channel on first use.
    ///
    /// The duplicate check and the append are one store operation, so two
    /// concurrent submissions of the same name never both get in.
    pub async fn challenge(&self, channel: &str, entrant: QueueEntry) -> CoreResult<ChallengeOutcome> {
        if entrant.name.trim().is_empty() {
            return Err(CoreError::validation("entrant name must not be empty"));
        }

        match self.store.append_unique(channel, &entrant).await? {
            AppendOutcome::Appended { position, created } => {
                if created {
                    info!(channel = %channel, "Channel not found, created a new queue");
                }
                info!(channel = %channel, name = %entrant.name, position, "Added challenger to queue");
                self.broadcaster
                    .publish(channel, QueueEvent::new_challenger(entrant, position));
                Ok(ChallengeOutcome::Queued { position })
            }
            AppendOutcome::AlreadyQueued { position } => {
                info!(channel = %channel, name = %entrant.name, position, "Challenger already queued");
                Ok(ChallengeOutcome::AlreadyQueued { entrant })
            }
        }
    }

    /// 1-based position of `name`. A missing channel reads as not queued.
    pub async fn position(&self, channel: &str, name: &str) -> CoreResult<PositionOutcome> {
        let queue = self.snapshot(channel).await?;
        Ok(queue
            .iter()
            .position(|entry| entry.name == name)
            .map(|index| PositionOutcome::Position(index + 1))
            .unwrap_or(PositionOutcome::NotQueued))
    }

    /// Full ordered queue. A missing channel reads as empty.
    pub async fn snapshot(&self, channel: &str) -> CoreResult<Vec<QueueEntry>> {
        match self.store.get(channel).await {
            Ok(queue) => Ok(queue),
            Err(StoreError::ChannelNotFound(_)) => {
                debug!(channel = %channel, "Snapshot of unknown channel");
                Ok(Vec::new())
            }
            Err(e) => Err(CoreError::StorageUnavailable(e)),
        }
    }

    /// Remove `name` from the queue.
    pub async fn remove(&self, channel: &str, name: &str) -> CoreResult<()> {
        match self.store.remove_by_name(channel, name).await {
            Ok(()) => {
                info!(channel = %channel, name = %name, "Removed challenger from queue");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!(channel = %channel, name = %name, "Challenger not queued, nothing removed");
                Err(CoreError::NotFound {
                    channel: channel.to_string(),
                    name: name.to_string(),
                })
            }
            Err(e) => Err(CoreError::StorageUnavailable(e)),
        }
    }

    /// Open a live view of `channel`.
    ///
    /// The connection is registered before the snapshot is read, so no event
    /// published in between is lost.
    pub async fn subscribe(&self, channel: &str) -> CoreResult<Subscription> {
        let pending = self.broadcaster.register(channel);
        let snapshot = self.snapshot(channel).await?;
        Ok(pending.activate(snapshot))
    }
}
