//! Channel owner queue management.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};

use ggnext_core::CoreError;

use super::internal_error;
use crate::auth::{authorize_key, KeyQuery};
use crate::state::AppState;

/// DELETE /channel/{channel}/queue/{user_name}
pub async fn remove_challenger(
    State(state): State<AppState>,
    Path((channel, user_name)): Path<(String, String)>,
    Query(query): Query<KeyQuery>,
) -> Result<StatusCode, (StatusCode, String)> {
    authorize_key(&state, &channel, query.api_key.as_deref()).await?;

    match state.queue.remove(&channel, &user_name).await {
        Ok(()) => Ok(StatusCode::OK),
        Err(CoreError::NotFound { .. }) => Err((StatusCode::NOT_FOUND, "Not Found".to_string())),
        Err(e) => Err(internal_error(&channel, e)),
    }
}
