//! End-to-end tests for the HTTP gateway against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use futures::StreamExt;
use tower::ServiceExt;

use ggnext_core::BroadcastConfig;
use ggnext_redis::{MemoryQueueStore, QueueStore};
use ggnext_web::{create_router, AppState};

const USER: &str = "name=maintestuser&displayName=MAINTESTUSER&provider=twitch&providerId=123456789&userLevel=owner";

async fn setup() -> (AppState, Router) {
    let store = Arc::new(MemoryQueueStore::new());
    store
        .grant_key(
            "validKey",
            &["validChannel".to_string(), "anotherValidChannel".to_string()],
        )
        .await
        .unwrap();
    let state = AppState::new(store, BroadcastConfig::default());
    let router = create_router(state.clone());
    (state, router)
}

fn user_header(name: &str) -> String {
    format!("name={}&displayName={}&provider=twitch", name, name.to_uppercase())
}

async fn get(router: &Router, uri: &str, user: Option<&str>) -> (StatusCode, String) {
    let mut request = Request::builder().uri(uri);
    if let Some(user) = user {
        request = request.header("nightbot-user", user);
    }
    let response = router
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn delete(router: &Router, uri: &str) -> StatusCode {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    router.clone().oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn health_check() {
    let (_, router) = setup().await;
    assert_eq!(get(&router, "/health", None).await, (StatusCode::OK, "ok".to_string()));
}

#[tokio::test]
async fn challenge_rejects_invalid_key() {
    let (_, router) = setup().await;
    let (status, _) = get(
        &router,
        "/channel/validChannel/challenge?apiKey=invalidKey&friendCode=0000-0000-0000",
        Some(USER),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn challenge_rejects_key_for_other_channel() {
    let (_, router) = setup().await;
    let (status, _) = get(
        &router,
        "/channel/wrongChannel/challenge?apiKey=validKey&friendCode=0000-0000-0000",
        Some(USER),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn challenge_requires_user_header() {
    let (_, router) = setup().await;
    let (status, _) = get(
        &router,
        "/channel/validChannel/challenge?apiKey=validKey&friendCode=0000-0000-0000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn challenge_rejects_bad_friend_code() {
    let (state, router) = setup().await;
    let (status, body) = get(
        &router,
        "/channel/validChannel/challenge?apiKey=validKey&friendCode=12-34",
        Some(USER),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        r#"You must enter a valid friend code ie. "!challenge 2817-2891-0029""#
    );
    assert!(state.queue.snapshot("validChannel").await.unwrap().is_empty());
}

#[tokio::test]
async fn challenge_creates_channel_then_reports_duplicate() {
    let (state, router) = setup().await;
    let uri = "/channel/validChannel/challenge?apiKey=validKey&friendCode=0000-0000-0000";

    let (status, body) = get(&router, uri, Some(USER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "maintestuser: you've been added to queue position #1");

    let (status, body) = get(&router, uri, Some(USER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "maintestuser: you're already queued up");

    let queue = state.queue.snapshot("validChannel").await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].friend_code, "0000-0000-0000");
    assert_eq!(queue[0].display_name, "MAINTESTUSER");
}

#[tokio::test]
async fn my_position_reports_rank() {
    let (_, router) = setup().await;
    for name in ["alice", "bob"] {
        get(
            &router,
            "/channel/validChannel/challenge?apiKey=validKey&friendCode=1111%202222%203333",
            Some(&user_header(name)),
        )
        .await;
    }

    let (status, body) = get(
        &router,
        "/channel/validChannel/myPosition?apiKey=validKey",
        Some(&user_header("bob")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "bob: you're currently in queue position #2");

    let (_, body) = get(
        &router,
        "/channel/anotherValidChannel/myPosition?apiKey=validKey",
        Some(&user_header("bob")),
    )
    .await;
    assert_eq!(body, "bob: you're not currently queued up");
}

#[tokio::test]
async fn delete_removes_challenger() {
    let (state, router) = setup().await;
    for name in ["alice", "bob"] {
        state
            .queue
            .challenge("validChannel", ggnext_core::QueueEntry::new(name))
            .await
            .unwrap();
    }

    assert_eq!(
        delete(&router, "/channel/validChannel/queue/alice?apiKey=validKey").await,
        StatusCode::OK
    );
    assert_eq!(
        delete(&router, "/channel/validChannel/queue/alice?apiKey=validKey").await,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        delete(&router, "/channel/anotherValidChannel/queue/bob?apiKey=validKey").await,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        delete(&router, "/channel/validChannel/queue/bob?apiKey=wrongKey").await,
        StatusCode::FORBIDDEN
    );

    let queue = state.queue.snapshot("validChannel").await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].name, "bob");
}

#[tokio::test]
async fn live_queue_streams_snapshot_then_new_challengers() {
    let (state, router) = setup().await;
    state
        .queue
        .challenge("validChannel", ggnext_core::QueueEntry::new("alice"))
        .await
        .unwrap();

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/channel/validChannel/queue?apiKey=validKey")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    let mut body = response.into_body().into_data_stream();
    let first = tokio::time::timeout(Duration::from_secs(5), body.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let first = String::from_utf8(first.to_vec()).unwrap();
    assert!(first.contains("event: fullQueue"));
    assert!(first.contains(r#""name":"alice""#));

    let (_, reply) = get(
        &router,
        "/channel/validChannel/challenge?apiKey=validKey&friendCode=0000-0000-0000",
        Some(&user_header("bob")),
    )
    .await;
    assert_eq!(reply, "bob: you've been added to queue position #2");

    let next = tokio::time::timeout(Duration::from_secs(5), body.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let next = String::from_utf8(next.to_vec()).unwrap();
    assert!(next.contains("event: newChallenger"));
    assert!(next.contains(r#""name":"bob""#));
    assert!(next.contains(r#""position":2"#));
    assert!(!next.contains("alice"));

    assert_eq!(state.queue.broadcaster().registry().subscriber_count("validChannel"), 1);
    drop(body);
    assert_eq!(state.queue.broadcaster().registry().subscriber_count("validChannel"), 0);
}

#[tokio::test]
async fn live_queue_of_unknown_channel_is_empty() {
    let (_, router) = setup().await;
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/channel/anotherValidChannel/queue?apiKey=validKey")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body().into_data_stream();
    let first = tokio::time::timeout(Duration::from_secs(5), body.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let first = String::from_utf8(first.to_vec()).unwrap();
    assert_eq!(first, "event: fullQueue\ndata: []\n\n");
}

#[tokio::test]
async fn live_queue_requires_valid_key() {
    let (state, router) = setup().await;
    let (status, _) = get(&router, "/channel/validChannel/queue?apiKey=nope", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(state.queue.broadcaster().registry().channel_count(), 0);
}
