//! Chat-bot command handlers.
//!
//! Replies are plain text; the bot relays them to the chat verbatim.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::info;

use ggnext_core::{ChallengeOutcome, PositionOutcome};

use super::internal_error;
use crate::auth::{authorize_key, NightbotUser};
use crate::state::AppState;
use crate::validation::{validate_friend_code, FRIEND_CODE_HINT};

#[derive(Debug, Deserialize)]
pub struct ChallengeQuery {
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
    #[serde(rename = "friendCode")]
    pub friend_code: Option<String>,
}

/// GET /channel/{channel}/challenge
pub async fn challenge(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    NightbotUser(user): NightbotUser,
    Query(query): Query<ChallengeQuery>,
) -> Result<String, (StatusCode, String)> {
    authorize_key(&state, &channel, query.api_key.as_deref()).await?;
    info!(channel = %channel, name = %user.name, "Challenge requested");

    let Some(friend_code) = query.friend_code.as_deref().and_then(validate_friend_code) else {
        info!(channel = %channel, name = %user.name, "Invalid friend code");
        return Ok(FRIEND_CODE_HINT.to_string());
    };

    let name = user.name.clone();
    let entrant = user.with_friend_code(friend_code);
    match state.queue.challenge(&channel, entrant).await {
        Ok(ChallengeOutcome::Queued { position }) => Ok(format!(
            "{}: you've been added to queue position #{}",
            name, position
        )),
        Ok(ChallengeOutcome::AlreadyQueued { .. }) => {
            Ok(format!("{}: you're already queued up", name))
        }
        Err(e) => Err(internal_error(&channel, e)),
    }
}

/// GET /channel/{channel}/myPosition
pub async fn my_position(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    NightbotUser(user): NightbotUser,
    Query(query): Query<ChallengeQuery>,
) -> Result<String, (StatusCode, String)> {
    authorize_key(&state, &channel, query.api_key.as_deref()).await?;

    match state.queue.position(&channel, &user.name).await {
        Ok(PositionOutcome::Position(position)) => Ok(format!(
            "{}: you're currently in queue position #{}",
            user.name, position
        )),
        Ok(PositionOutcome::NotQueued) => {
            Ok(format!("{}: you're not currently queued up", user.name))
        }
        Err(e) => Err(internal_error(&channel, e)),
    }
}
