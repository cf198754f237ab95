//! Server-sent events handler for the live queue view.

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, Sse},
};
use futures::stream::{Stream, StreamExt};
use tracing::{error, info};

use ggnext_core::QueueEvent;

use crate::routes::internal_error;
use crate::auth::{authorize_key, KeyQuery};
use crate::state::AppState;

/// GET /channel/{channel}/queue - stream queue events to a viewer.
///
/// The first event is the full queue; later events are new challengers and
/// periodic heartbeats. The subscription is dropped, and the viewer
/// unregistered, as soon as the client goes away.
pub async fn live_queue(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Query(query): Query<KeyQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    authorize_key(&state, &channel, query.api_key.as_deref()).await?;

    let subscription = state
        .queue
        .subscribe(&channel)
        .await
        .map_err(|e| internal_error(&channel, e))?;
    info!(channel = %channel, connection = %subscription.id(), "Established live queue connection");

    let stream = subscription.filter_map(|event| async move { to_sse_event(&event).map(Ok) });
    Ok(Sse::new(stream))
}

fn to_sse_event(event: &QueueEvent) -> Option<Event> {
    match event.data() {
        Ok(data) => Some(Event::default().event(event.name()).data(data)),
        Err(e) => {
            error!(event = event.name(), error = %e, "Failed to encode queue event");
            None
        }
    }
}
