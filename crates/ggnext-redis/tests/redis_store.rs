//! Redis-backed store behaviour.
//!
//! These tests need a scratch Redis server and run only when
//! `GGNEXT_TEST_REDIS_URL` is set, e.g. `redis://127.0.0.1:6379/15`.
//! Every test works on its own randomly named channel.

use std::sync::Arc;
use std::time::Duration;

use redis::AsyncCommands;

use ggnext_redis::{
    init_pool, AppendOutcome, ConnectOptions, QueueEntry, QueueStore, RedisPool, RedisQueueStore,
    StoreError,
};

const REDIS_URL_VAR: &str = "GGNEXT_TEST_REDIS_URL";
const CHANNELS_KEY: &str = "ggnext:channels";

struct Fixture {
    store: Arc<RedisQueueStore>,
    pool: RedisPool,
    channel: String,
}

impl Fixture {
    fn queue_key(&self) -> String {
        format!("ggnext:queue:{}", self.channel)
    }

    async fn cleanup(self) {
        let mut conn = self.pool.clone();
        let _: () = conn.srem(CHANNELS_KEY, &self.channel).await.unwrap();
        let _: () = conn.del(self.queue_key()).await.unwrap();
    }
}

async fn fixture() -> Option<Fixture> {
    let Ok(url) = std::env::var(REDIS_URL_VAR) else {
        eprintln!("{} not set, skipping Redis store test", REDIS_URL_VAR);
        return None;
    };
    let options = ConnectOptions {
        max_attempts: 1,
        retry_interval: Duration::from_millis(10),
    };
    let pool = init_pool(&url, options).await.unwrap();
    Some(Fixture {
        store: Arc::new(RedisQueueStore::new(pool.clone())),
        pool,
        channel: format!("test-{}", uuid::Uuid::new_v4()),
    })
}

fn names(entries: &[QueueEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

#[tokio::test]
async fn test_get_missing_channel() {
    let Some(fx) = fixture().await else { return };
    assert!(matches!(
        fx.store.get(&fx.channel).await,
        Err(StoreError::ChannelNotFound(_))
    ));
    fx.cleanup().await;
}

#[tokio::test]
async fn test_create_then_append() {
    let Some(fx) = fixture().await else { return };
    let ch = fx.channel.clone();
    fx.store.create(&ch, &[QueueEntry::new("alice")]).await.unwrap();
    assert_eq!(fx.store.append(&ch, &QueueEntry::new("bob")).await.unwrap(), 2);
    assert_eq!(names(&fx.store.get(&ch).await.unwrap()), vec!["alice", "bob"]);
    fx.cleanup().await;
}

#[tokio::test]
async fn test_create_existing_channel() {
    let Some(fx) = fixture().await else { return };
    let ch = fx.channel.clone();
    fx.store.create(&ch, &[]).await.unwrap();
    assert!(matches!(
        fx.store.create(&ch, &[QueueEntry::new("alice")]).await,
        Err(StoreError::AlreadyExists(_))
    ));
    assert!(fx.store.get(&ch).await.unwrap().is_empty());
    fx.cleanup().await;
}

#[tokio::test]
async fn test_create_replaces_stale_list() {
    let Some(fx) = fixture().await else { return };
    let ch = fx.channel.clone();
    // A list left behind without channel membership must not leak into the new queue.
    let mut conn = fx.pool.clone();
    let _: () = conn.rpush(fx.queue_key(), r#"{"name":"ghost"}"#).await.unwrap();

    fx.store.create(&ch, &[QueueEntry::new("alice")]).await.unwrap();
    assert_eq!(names(&fx.store.get(&ch).await.unwrap()), vec!["alice"]);
    fx.cleanup().await;
}

#[tokio::test]
async fn test_append_missing_channel() {
    let Some(fx) = fixture().await else { return };
    assert!(matches!(
        fx.store.append(&fx.channel, &QueueEntry::new("alice")).await,
        Err(StoreError::ChannelNotFound(_))
    ));
    fx.cleanup().await;
}

#[tokio::test]
async fn test_entry_fields_survive_storage() {
    let Some(fx) = fixture().await else { return };
    let ch = fx.channel.clone();
    let entry = QueueEntry::new("alice")
        .with_display_name("Alice")
        .with_friend_code("1111-2222-3333")
        .with_field("provider", "twitch");
    fx.store.append_unique(&ch, &entry).await.unwrap();
    assert_eq!(fx.store.get(&ch).await.unwrap(), vec![entry]);
    fx.cleanup().await;
}

#[tokio::test]
async fn test_remove_by_name() {
    let Some(fx) = fixture().await else { return };
    let ch = fx.channel.clone();
    fx.store
        .create(
            &ch,
            &[
                QueueEntry::new("alice"),
                QueueEntry::new("bob").with_friend_code("1111-2222-3333").with_field("provider", "twitch"),
                QueueEntry::new("carol"),
            ],
        )
        .await
        .unwrap();

    fx.store.remove_by_name(&ch, "bob").await.unwrap();
    assert_eq!(names(&fx.store.get(&ch).await.unwrap()), vec!["alice", "carol"]);

    let err = fx.store.remove_by_name(&ch, "bob").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
    fx.cleanup().await;
}

#[tokio::test]
async fn test_remove_from_missing_channel() {
    let Some(fx) = fixture().await else { return };
    let err = fx.store.remove_by_name(&fx.channel, "alice").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
    fx.cleanup().await;
}

#[tokio::test]
async fn test_emptied_channel_still_exists() {
    let Some(fx) = fixture().await else { return };
    let ch = fx.channel.clone();
    fx.store.append_unique(&ch, &QueueEntry::new("alice")).await.unwrap();
    fx.store.remove_by_name(&ch, "alice").await.unwrap();
    assert!(fx.store.get(&ch).await.unwrap().is_empty());

    let outcome = fx.store.append_unique(&ch, &QueueEntry::new("bob")).await.unwrap();
    assert_eq!(outcome, AppendOutcome::Appended { position: 1, created: false });
    fx.cleanup().await;
}

#[tokio::test]
async fn test_append_unique_creates_and_dedups() {
    let Some(fx) = fixture().await else { return };
    let ch = fx.channel.clone();
    let outcome = fx.store.append_unique(&ch, &QueueEntry::new("alice")).await.unwrap();
    assert_eq!(outcome, AppendOutcome::Appended { position: 1, created: true });

    let outcome = fx.store.append_unique(&ch, &QueueEntry::new("bob")).await.unwrap();
    assert_eq!(outcome, AppendOutcome::Appended { position: 2, created: false });

    let again = QueueEntry::new("bob").with_friend_code("9999-9999-9999");
    let outcome = fx.store.append_unique(&ch, &again).await.unwrap();
    assert_eq!(outcome, AppendOutcome::AlreadyQueued { position: 2 });
    assert_eq!(names(&fx.store.get(&ch).await.unwrap()), vec!["alice", "bob"]);
    fx.cleanup().await;
}

#[tokio::test]
async fn test_names_are_case_sensitive() {
    let Some(fx) = fixture().await else { return };
    let ch = fx.channel.clone();
    fx.store.append_unique(&ch, &QueueEntry::new("alice")).await.unwrap();
    let outcome = fx.store.append_unique(&ch, &QueueEntry::new("Alice")).await.unwrap();
    assert_eq!(outcome, AppendOutcome::Appended { position: 2, created: false });
    fx.cleanup().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_append_unique_same_name() {
    let Some(fx) = fixture().await else { return };
    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let store = fx.store.clone();
            let ch = fx.channel.clone();
            tokio::spawn(async move {
                store.append_unique(&ch, &QueueEntry::new("alice")).await.unwrap()
            })
        })
        .collect();

    let outcomes = futures::future::join_all(tasks).await;
    let appended = outcomes
        .into_iter()
        .map(|o| o.unwrap())
        .filter(|o| matches!(o, AppendOutcome::Appended { .. }))
        .count();
    assert_eq!(appended, 1);
    assert_eq!(fx.store.get(&fx.channel).await.unwrap().len(), 1);
    fx.cleanup().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_are_not_lost() {
    let Some(fx) = fixture().await else { return };
    let tasks: Vec<_> = (0..50)
        .map(|i| {
            let store = fx.store.clone();
            let ch = fx.channel.clone();
            tokio::spawn(async move {
                store
                    .append_unique(&ch, &QueueEntry::new(format!("user{}", i)))
                    .await
                    .unwrap()
            })
        })
        .collect();
    futures::future::join_all(tasks).await;
    assert_eq!(fx.store.get(&fx.channel).await.unwrap().len(), 50);
    fx.cleanup().await;
}

#[tokio::test]
async fn test_api_keys() {
    let Some(fx) = fixture().await else { return };
    let key = format!("key-{}", uuid::Uuid::new_v4());
    assert_eq!(fx.store.channels_for_key(&key).await.unwrap(), None);

    fx.store
        .grant_key(&key, &["foo".to_string(), "bar".to_string()])
        .await
        .unwrap();
    assert_eq!(
        fx.store.channels_for_key(&key).await.unwrap(),
        Some(vec!["bar".to_string(), "foo".to_string()])
    );

    assert!(fx.store.revoke_key(&key).await.unwrap());
    assert!(!fx.store.revoke_key(&key).await.unwrap());
    assert_eq!(fx.store.channels_for_key(&key).await.unwrap(), None);
    fx.cleanup().await;
}
