//! Live fan-out of queue events.
//!
//! Each connection owns a bounded outbound queue. `publish` copies the
//! channel's subscriber list and pushes into every queue without awaiting, so
//! one slow or vanished viewer never holds up the others. The connection's
//! [`Subscription`] is the only writer for that connection: it merges queued
//! events with its heartbeat timer in a single loop.

use std::collections::{HashSet, VecDeque};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::{self, BoxStream, Stream, StreamExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use ggnext_redis::QueueEntry;

use crate::event::QueueEvent;
use crate::registry::{ConnectionId, Subscriber, SubscriberRegistry};

/// Default keep-alive period; below common proxy idle timeouts.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(45);

/// Default outbound queue depth per connection.
pub const DEFAULT_CONNECTION_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy)]
pub struct BroadcastConfig {
    pub heartbeat_interval: Duration,
    pub connection_buffer: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            connection_buffer: DEFAULT_CONNECTION_BUFFER,
        }
    }
}

pub struct Broadcaster {
    registry: Arc<SubscriberRegistry>,
    config: BroadcastConfig,
}

impl Broadcaster {
    pub fn new(config: BroadcastConfig) -> Self {
        Self {
            registry: Arc::new(SubscriberRegistry::new()),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    pub fn config(&self) -> BroadcastConfig {
        self.config
    }

    /// Deliver `event` to every connection subscribed to `channel` right now.
    /// Returns the number of connections it was queued for.
    pub fn publish(&self, channel: &str, event: QueueEvent) -> usize {
        let subscribers = self.registry.subscribers(channel);
        let mut delivered = 0;
        for subscriber in subscribers {
            match subscriber.tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        channel = %channel,
                        connection = %subscriber.id,
                        "Viewer fell behind, dropping connection"
                    );
                    self.registry.unsubscribe(channel, subscriber.id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(channel = %channel, connection = %subscriber.id, "Viewer connection lost");
                    self.registry.unsubscribe(channel, subscriber.id);
                }
            }
        }
        debug!(channel = %channel, event = event.name(), delivered, "Published queue event");
        delivered
    }

    /// Register a new connection. Events published from here on are queued
    /// for it; call [`PendingSubscription::activate`] with the current queue
    /// to start streaming.
    pub fn register(&self, channel: &str) -> PendingSubscription {
        let (tx, rx) = mpsc::channel(self.config.connection_buffer.max(1));
        let id = ConnectionId::new();
        self.registry.subscribe(channel, Subscriber { id, tx });
        info!(
            channel = %channel,
            connection = %id,
            viewers = self.registry.subscriber_count(channel),
            "Viewer subscribed"
        );
        PendingSubscription {
            rx,
            guard: SubscriptionGuard {
                registry: self.registry.clone(),
                channel: channel.to_string(),
                id,
            },
            heartbeat_interval: self.config.heartbeat_interval,
        }
    }

    /// Disconnect every viewer, e.g. on shutdown.
    pub fn close_all(&self) -> usize {
        let closed = self.registry.clear();
        info!(closed, "Closed all viewer connections");
        closed
    }
}

/// Removes the registry entry when the connection goes away.
struct SubscriptionGuard {
    registry: Arc<SubscriberRegistry>,
    channel: String,
    id: ConnectionId,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if self.registry.unsubscribe(&self.channel, self.id) {
            info!(channel = %self.channel, connection = %self.id, "Viewer unsubscribed");
        }
    }
}

/// A registered connection that has not received its snapshot yet.
pub struct PendingSubscription {
    rx: mpsc::Receiver<QueueEvent>,
    guard: SubscriptionGuard,
    heartbeat_interval: Duration,
}

impl PendingSubscription {
    pub fn id(&self) -> ConnectionId {
        self.guard.id
    }

    /// Start the stream with `snapshot` as its first event.
    ///
    /// `snapshot` must have been read after registration. A challenger whose
    /// store append landed before the snapshot read may be published either
    /// before or after activation, so the first `newChallenger` for each
    /// snapshot name is treated as already shown and skipped.
    pub fn activate(mut self, snapshot: Vec<QueueEntry>) -> Subscription {
        let mut shown = ShownEntrants(snapshot.iter().map(|e| e.name.clone()).collect());
        let mut pending = VecDeque::new();
        pending.push_back(QueueEvent::FullQueue(snapshot));
        while let Ok(event) = self.rx.try_recv() {
            if !shown.take(&event) {
                pending.push_back(event);
            }
        }

        let period = self.heartbeat_interval;
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let id = self.guard.id;
        let channel = self.guard.channel.clone();
        let state = WriterState {
            pending,
            shown,
            rx: self.rx,
            heartbeat,
            _guard: self.guard,
        };

        Subscription {
            id,
            channel,
            inner: stream::unfold(state, next_event).boxed(),
        }
    }
}

/// Snapshot names whose `newChallenger` has not been seen yet.
struct ShownEntrants(HashSet<String>);

impl ShownEntrants {
    /// True if `event` announces an entrant the snapshot already showed.
    /// Each name is consumed once.
    fn take(&mut self, event: &QueueEvent) -> bool {
        match event {
            QueueEvent::NewChallenger { entry, .. } => self.0.remove(&entry.name),
            _ => false,
        }
    }
}

struct WriterState {
    pending: VecDeque<QueueEvent>,
    shown: ShownEntrants,
    rx: mpsc::Receiver<QueueEvent>,
    heartbeat: Interval,
    _guard: SubscriptionGuard,
}

async fn next_event(mut state: WriterState) -> Option<(QueueEvent, WriterState)> {
    if let Some(event) = state.pending.pop_front() {
        return Some((event, state));
    }
    loop {
        let next = tokio::select! {
            biased;
            event = state.rx.recv() => event,
            _ = state.heartbeat.tick() => Some(QueueEvent::Heartbeat),
        };
        match next {
            Some(event) if state.shown.take(&event) => continue,
            Some(event) => return Some((event, state)),
            // The registry dropped us (lagging or shutdown).
            None => return None,
        }
    }
}

/// Live event stream for one viewer of one channel.
///
/// Yields `fullQueue` first, then `newChallenger` and `heartbeat` events
/// until dropped. Dropping it stops the heartbeat and unregisters the
/// connection.
pub struct Subscription {
    id: ConnectionId,
    channel: String,
    inner: BoxStream<'static, QueueEvent>,
}

impl Subscription {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl Stream for Subscription {
    type Item = QueueEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}
