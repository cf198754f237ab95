//! Route handlers.

pub mod challenge;
pub mod queue;

use axum::http::StatusCode;
use ggnext_core::CoreError;
use tracing::error;

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// Map a storage failure to a generic 500.
pub(crate) fn internal_error(channel: &str, err: CoreError) -> (StatusCode, String) {
    error!(channel = %channel, error = %err, "Queue operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error".to_string(),
    )
}
