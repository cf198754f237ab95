//! Caller identity and API key checks.
//!
//! The chat bot identifies the viewer through the `nightbot-user` header and
//! proves it may act for a channel with an `apiKey` query parameter.

use std::collections::BTreeMap;

use axum::{
    extract::{FromRequestParts, Query},
    http::{request::Parts, StatusCode, Uri},
};
use serde::Deserialize;
use tracing::{error, warn};

use ggnext_core::QueueEntry;

use crate::state::AppState;

pub const NIGHTBOT_USER_HEADER: &str = "nightbot-user";

/// Query parameters carrying the channel API key.
#[derive(Debug, Default, Deserialize)]
pub struct KeyQuery {
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
}

/// Check that `api_key` may act for `channel`.
pub async fn authorize_key(
    state: &AppState,
    channel: &str,
    api_key: Option<&str>,
) -> Result<(), (StatusCode, String)> {
    let Some(api_key) = api_key else {
        warn!(channel = %channel, "Request without API key");
        return Err((StatusCode::FORBIDDEN, "Forbidden".to_string()));
    };

    match state.store().channels_for_key(api_key).await {
        Ok(Some(channels)) if channels.iter().any(|c| c == channel) => Ok(()),
        Ok(_) => {
            warn!(channel = %channel, "API key is not valid for channel");
            Err((StatusCode::FORBIDDEN, "Forbidden".to_string()))
        }
        Err(e) => {
            error!(channel = %channel, error = %e, "API key lookup failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string()))
        }
    }
}

/// The viewer issuing a chat command, as described by the chat bot.
#[derive(Debug, Clone)]
pub struct NightbotUser(pub QueueEntry);

impl<S> FromRequestParts<S> for NightbotUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(NIGHTBOT_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_nightbot_user)
            .map(NightbotUser)
            .ok_or_else(|| {
                warn!("Missing or malformed nightbot-user header");
                (StatusCode::BAD_REQUEST, "Bad Request".to_string())
            })
    }
}

/// Parse the form-encoded `nightbot-user` header into a queue entry.
///
/// `name` is required. Fields other than `name` and `displayName` are kept
/// as-is; any `friendCode` in the header is ignored because the code comes
/// from the command arguments.
pub fn parse_nightbot_user(raw: &str) -> Option<QueueEntry> {
    let uri: Uri = format!("/?{}", raw).parse().ok()?;
    let Query(mut fields) = Query::<BTreeMap<String, String>>::try_from_uri(&uri).ok()?;

    let name = fields.remove("name").filter(|name| !name.trim().is_empty())?;
    let display_name = fields.remove("displayName").unwrap_or_else(|| name.clone());
    fields.remove("friendCode");

    Some(
        fields
            .into_iter()
            .fold(QueueEntry::new(name).with_display_name(display_name), |entry, (key, value)| {
                entry.with_field(key, value)
            }),
    )
}
