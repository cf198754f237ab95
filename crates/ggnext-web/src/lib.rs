//! ggNext Web Server
//!
//! Axum-based gateway for the chat-bot commands and the live queue view.

pub mod auth;
pub mod routes;
pub mod sse;
pub mod state;
pub mod validation;

use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

pub use state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        // Chat-bot commands
        .route("/channel/{channel}/challenge", get(routes::challenge::challenge))
        .route("/channel/{channel}/myPosition", get(routes::challenge::my_position))
        // Channel owner
        .route("/channel/{channel}/queue", get(sse::live_queue))
        .route(
            "/channel/{channel}/queue/{user_name}",
            delete(routes::queue::remove_challenger),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Run the web server until Ctrl+C.
///
/// On shutdown every live view is closed so in-flight SSE responses end and
/// the graceful shutdown can complete.
pub async fn run_server(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let broadcaster = state.queue.broadcaster().clone();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    info!("ggNext listening on http://{}:{}", host, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            broadcaster.close_all();
        })
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
