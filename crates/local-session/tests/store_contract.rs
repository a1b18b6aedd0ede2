//! Integration tests driving the cache through the middleware contract.

use std::sync::Arc;

use local_session::{
    ErrorKind, FixedRandom, GetOptions, ManualClock, SessionCache, SessionCacheOptions,
    SessionPayload, SessionStore, SetOptions,
};
use serde_json::json;

const NOW: i64 = 1_700_000_000_000;
const TTL: u64 = 15_000;

fn payload(value: serde_json::Value) -> SessionPayload {
    serde_json::from_value(value).unwrap()
}

async fn exercise(store: &dyn SessionStore, key: &str, expire: i64) {
    let data = payload(json!({"views": 1, "_expire": expire}));
    let changed = SetOptions::new().with_changed(true);

    store.set(key, data.clone(), Some(TTL), &changed).await.unwrap();
    let loaded = store.get(key, Some(TTL), &GetOptions::default()).await.unwrap();
    assert_eq!(loaded, Some(data));

    store.destroy(key).await.unwrap();
    let loaded = store.get(key, Some(TTL), &GetOptions::default()).await.unwrap();
    assert_eq!(loaded, None);

    // Destroying again is a no-op.
    store.destroy(key).await.unwrap();
}

#[tokio::test]
async fn test_default_cache_round_trip() {
    let cache = SessionCache::new(SessionCacheOptions::default()).unwrap();
    let expire = chrono::Utc::now().timestamp_millis() + TTL as i64;

    exercise(&cache, "abc1234567890", expire).await;
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_set_without_intent_is_rejected() {
    let cache = SessionCache::new(SessionCacheOptions::default()).unwrap();
    let store: &dyn SessionStore = &cache;

    let err = store
        .set("k", payload(json!({"views": 1})), Some(TTL), &SetOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnresolvableIntent);
    assert_eq!(cache.len(), 0);
}

#[tokio::test]
async fn test_middleware_flags_from_json() {
    let clock = Arc::new(ManualClock::new(NOW));
    let cache = SessionCache::with_parts(
        SessionCacheOptions::default(),
        clock.clone(),
        Arc::new(FixedRandom::new(0.0)),
    )
    .unwrap();
    let store: &dyn SessionStore = &cache;

    let create: SetOptions = serde_json::from_value(json!({"changed": true})).unwrap();
    let renew: SetOptions = serde_json::from_value(json!({"renew": true})).unwrap();
    let data = payload(json!({"views": 1, "_expire": NOW + 1_000}));

    store.set("k", data.clone(), Some(TTL), &create).await.unwrap();
    clock.advance(10);
    store.set("k", data, Some(TTL), &renew).await.unwrap();

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.record("k").unwrap().created_at, NOW + 10);
}

#[tokio::test]
async fn test_sweep_on_unrelated_get() {
    let options = SessionCacheOptions::from_value(&json!({
        "gc": true,
        "probability": 1,
        "maxlifetime": 1
    }))
    .unwrap();
    let cache = SessionCache::new(options).unwrap();
    let store: &dyn SessionStore = &cache;

    let expired = chrono::Utc::now().timestamp_millis() - 90_000;
    store
        .set(
            "abc1234567890",
            payload(json!({"views": 1, "_expire": expired})),
            Some(TTL),
            &SetOptions::new().with_force(true),
        )
        .await
        .unwrap();
    assert_eq!(cache.len(), 1);

    let loaded = store
        .get("0987654321cba", None, &GetOptions::default())
        .await
        .unwrap();
    assert_eq!(loaded, None);
    assert!(!cache.contains("abc1234567890"));
    assert_eq!(cache.stats().reclaimed, 1);
}

#[tokio::test]
async fn test_shared_across_tasks() {
    let cache = SessionCache::new(
        SessionCacheOptions::new()
            .with_gc(true)
            .with_probability(1.0)
            .with_max_lifetime(0),
    )
    .unwrap();
    let expire = chrono::Utc::now().timestamp_millis() + 60_000;

    let mut handles = Vec::new();
    for i in 0..8 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            let key = format!("session-{}", i);
            let data = SessionPayload::new().with("views", i).with_expire(expire);
            SessionStore::set(&cache, &key, data, Some(TTL), &SetOptions::new().with_rolling(true))
                .await
                .unwrap();
            SessionStore::get(&cache, &key, Some(TTL), &GetOptions::default())
                .await
                .unwrap()
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().is_some());
    }
    assert_eq!(cache.len(), 8);
}
