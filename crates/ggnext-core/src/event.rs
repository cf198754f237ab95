//! Events pushed to live queue viewers.

use serde::{Deserialize, Serialize};

use ggnext_redis::QueueEntry;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum QueueEvent {
    /// The whole queue, sent once when a viewer connects.
    FullQueue(Vec<QueueEntry>),
    /// A challenger joined the queue at 1-based `position`.
    NewChallenger { entry: QueueEntry, position: usize },
    /// Keep-alive for idle connections.
    Heartbeat,
}

impl QueueEvent {
    pub fn new_challenger(entry: QueueEntry, position: usize) -> Self {
        Self::NewChallenger { entry, position }
    }

    /// Event name as seen by the dashboard.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FullQueue(_) => "fullQueue",
            Self::NewChallenger { .. } => "newChallenger",
            Self::Heartbeat => "heartbeat",
        }
    }

    /// Event payload. Heartbeats carry the bare word `heartbeat`; a new
    /// challenger is the entry object plus its `position`.
    pub fn data(&self) -> serde_json::Result<String> {
        match self {
            Self::FullQueue(entries) => serde_json::to_string(entries),
            Self::NewChallenger { entry, position } => {
                let mut value = serde_json::to_value(entry)?;
                if let serde_json::Value::Object(fields) = &mut value {
                    fields.insert("position".to_string(), (*position).into());
                }
                serde_json::to_string(&value)
            }
            Self::Heartbeat => Ok("heartbeat".to_string()),
        }
    }
}
