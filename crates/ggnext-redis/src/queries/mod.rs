//! Redis query modules.

pub mod api_keys;
pub mod queue;

/// Set of every channel that has ever had a queue.
pub(crate) const CHANNELS_KEY: &str = "ggnext:channels";

pub(crate) fn queue_key(channel: &str) -> String {
    format!("ggnext:queue:{}", channel)
}

pub(crate) fn api_key_key(api_key: &str) -> String {
    format!("ggnext:apikey:{}", api_key)
}
