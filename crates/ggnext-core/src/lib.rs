//! ggNext Core Library
//!
//! Challenger queue rules and live fan-out of queue events to viewers.

pub mod broadcast;
pub mod error;
pub mod event;
pub mod queue;
pub mod registry;

pub use broadcast::{BroadcastConfig, Broadcaster, Subscription};
pub use error::{CoreError, CoreResult};
pub use event::QueueEvent;
pub use ggnext_redis::QueueEntry;
pub use queue::{ChallengeOutcome, PositionOutcome, QueueService};
pub use registry::{ConnectionId, SubscriberRegistry};
