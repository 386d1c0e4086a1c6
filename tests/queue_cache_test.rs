use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use sporlctl::{
    error::PlaybackError,
    management::QueueCache,
    types::{QueueTrack, QueueView},
};

fn view(uris: &[&str]) -> QueueView {
    QueueView {
        upcoming: uris
            .iter()
            .map(|uri| QueueTrack {
                uri: uri.to_string(),
                name: uri.to_string(),
                artists: vec![],
                album: None,
            })
            .collect(),
        context_position: None,
    }
}

async fn load(
    cache: &QueueCache,
    calls: &AtomicUsize,
    result: Result<QueueView, PlaybackError>,
) -> Result<QueueView, PlaybackError> {
    cache
        .get(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            result
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn reads_within_ttl_hit_the_cache() {
    let cache = QueueCache::default();
    let calls = AtomicUsize::new(0);

    let first = load(&cache, &calls, Ok(view(&["a", "b"]))).await.unwrap();
    let second = load(&cache, &calls, Ok(view(&["other"]))).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn expired_entry_is_reloaded() {
    let cache = QueueCache::default();
    let calls = AtomicUsize::new(0);

    load(&cache, &calls, Ok(view(&["a"]))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1001)).await;
    let fresh = load(&cache, &calls, Ok(view(&["b"]))).await.unwrap();

    assert_eq!(fresh, view(&["b"]));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn invalidation_forces_a_reload() {
    let cache = QueueCache::default();
    let calls = AtomicUsize::new(0);

    load(&cache, &calls, Ok(view(&["a"]))).await.unwrap();
    cache.invalidate();
    assert!(!cache.is_populated());
    load(&cache, &calls, Ok(view(&["b"]))).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_reload_serves_the_last_view() {
    let cache = QueueCache::default();
    let calls = AtomicUsize::new(0);

    load(&cache, &calls, Ok(view(&["a", "b"]))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let stale = load(&cache, &calls, Err(PlaybackError::Network(String::from("reset"))))
        .await
        .unwrap();

    assert_eq!(stale, view(&["a", "b"]));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn failure_without_entry_propagates() {
    let cache = QueueCache::default();
    let calls = AtomicUsize::new(0);

    let err = load(&cache, &calls, Err(PlaybackError::Network(String::from("reset"))))
        .await
        .unwrap_err();

    assert!(matches!(err, PlaybackError::Network(_)));
}

#[tokio::test(start_paused = true)]
async fn missing_credentials_are_never_masked() {
    let cache = QueueCache::default();
    let calls = AtomicUsize::new(0);

    load(&cache, &calls, Ok(view(&["a"]))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let err = load(&cache, &calls, Err(PlaybackError::Unauthenticated))
        .await
        .unwrap_err();

    assert!(matches!(err, PlaybackError::Unauthenticated));
}

#[tokio::test(start_paused = true)]
async fn load_overtaken_by_invalidation_is_not_stored() {
    let cache = QueueCache::default();

    let loaded = cache
        .get(|| async {
            cache.invalidate();
            Ok(view(&["a"]))
        })
        .await
        .unwrap();

    assert_eq!(loaded, view(&["a"]));
    assert!(!cache.is_populated());
}
