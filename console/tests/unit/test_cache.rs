//! Query cache tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use opsconsole::cache::key::{CacheKey, Collection, KeyPattern};
use opsconsole::cache::query::{CacheEvent, Fetcher, QueryCache};
use opsconsole::errors::ConsoleError;
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// Answers fetches in call order; a call with a prepared gate waits for it,
/// any other call answers immediately with its call number
#[derive(Default)]
struct ScriptedFetcher {
    calls: AtomicUsize,
    gates: Mutex<Vec<Option<oneshot::Receiver<Value>>>>,
}

impl ScriptedFetcher {
    /// Hold back the next unprepared call until the returned sender fires
    fn gate(&self) -> oneshot::Sender<Value> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push(Some(rx));
        tx
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn wait_for_calls(&self, n: usize) {
        while self.calls() < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, key: &CacheKey) -> Result<Value, ConsoleError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if key.collection() == Collection::Project && key.param_i64("id") == Some(404) {
            return Err(ConsoleError::NotFound("Project not found".to_string()));
        }

        let gate = self
            .gates
            .lock()
            .unwrap()
            .get_mut(call)
            .and_then(Option::take);
        match gate {
            Some(gate) => gate
                .await
                .map_err(|_| ConsoleError::Internal("gate dropped".to_string())),
            None => Ok(json!({ "call": call })),
        }
    }
}

fn cache_with(capacity: usize) -> (QueryCache, Arc<ScriptedFetcher>) {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let cache = QueryCache::new(fetcher.clone(), capacity);
    (cache, fetcher)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn test_concurrent_reads_share_one_fetch() {
    let (cache, fetcher) = cache_with(16);
    let key = CacheKey::projects(None);

    let first = cache.read(&key);
    let second = cache.read(&key);
    assert!(first.loading && second.loading);
    assert!(first.value.is_none());

    let (a, b) = tokio::join!(cache.load(&key), cache.load(&key));
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_fresh_value_served_without_fetch() {
    let (cache, fetcher) = cache_with(16);
    let key = CacheKey::organizations();

    cache.load(&key).await.unwrap();
    let snapshot = cache.read(&key);

    assert!(!snapshot.loading);
    assert!(!snapshot.stale);
    assert_eq!(snapshot.value.as_deref(), Some(&json!({ "call": 0 })));
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_read_after_invalidate_never_returns_old_data() {
    let (cache, fetcher) = cache_with(16);
    let key = CacheKey::alerts(None, None, None);

    cache.load(&key).await.unwrap();
    assert_eq!(cache.invalidate(&KeyPattern::from(Collection::Alerts)), 1);

    let snapshot = cache.read(&key);
    assert!(snapshot.stale);
    assert!(snapshot.loading);

    let value = cache.load(&key).await.unwrap();
    assert_eq!(*value, json!({ "call": 1 }));
    assert_eq!(fetcher.calls(), 2);
    assert!(!cache.read(&key).stale);
}

#[tokio::test]
async fn test_older_completion_is_discarded() {
    let (cache, fetcher) = cache_with(16);
    let key = CacheKey::deployments(Some(7), None);

    let old = fetcher.gate();
    let new = fetcher.gate();

    let _subscription = cache.subscribe(key.clone());
    fetcher.wait_for_calls(1).await;

    // Observed key: invalidation issues a superseding fetch right away
    cache.invalidate(&KeyPattern::covering(Collection::Deployments, "project_id", 7));
    fetcher.wait_for_calls(2).await;

    new.send(json!(["new"])).unwrap();
    settle().await;
    old.send(json!(["old"])).unwrap();
    settle().await;

    let snapshot = cache.read(&key);
    assert_eq!(snapshot.value.as_deref(), Some(&json!(["new"])));
    assert!(!snapshot.stale);
    assert!(!snapshot.loading);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_load_waits_for_superseding_fetch() {
    let (cache, fetcher) = cache_with(16);
    let key = CacheKey::projects(None);

    let old = fetcher.gate();
    let _subscription = cache.subscribe(key.clone());
    fetcher.wait_for_calls(1).await;

    let loader = {
        let cache = cache.clone();
        let key = key.clone();
        tokio::spawn(async move { cache.load(&key).await })
    };
    tokio::task::yield_now().await;

    cache.invalidate(&KeyPattern::from(Collection::Projects));
    old.send(json!(["before"])).unwrap();

    let value = loader.await.unwrap().unwrap();
    assert_eq!(*value, json!({ "call": 1 }));
}

#[tokio::test]
async fn test_invalidate_only_refetches_observed_keys() {
    let (cache, fetcher) = cache_with(16);
    let observed = CacheKey::deployments(Some(7), None);
    let idle = CacheKey::deployments(None, None);

    let _subscription = cache.subscribe(observed.clone());
    cache.load(&observed).await.unwrap();
    cache.load(&idle).await.unwrap();
    assert_eq!(fetcher.calls(), 2);

    assert_eq!(cache.invalidate(&KeyPattern::from(Collection::Deployments)), 2);
    settle().await;

    assert_eq!(fetcher.calls(), 3);
    assert!(!cache.peek(&observed).unwrap().stale);
    assert!(cache.peek(&idle).unwrap().stale);
}

#[tokio::test]
async fn test_updated_event_only_when_content_changes() {
    let (cache, fetcher) = cache_with(16);
    let key = CacheKey::servers(None);
    let mut events = cache.events();

    let first = fetcher.gate();
    let second = fetcher.gate();
    let _subscription = cache.subscribe(key.clone());
    first.send(json!(["db-1"])).unwrap();
    cache.load(&key).await.unwrap();

    cache.invalidate(&KeyPattern::Exact(key.clone()));
    second.send(json!(["db-1"])).unwrap();
    cache.load(&key).await.unwrap();

    let mut updated = 0;
    let mut invalidated = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            CacheEvent::Updated(k) if k == key => updated += 1,
            CacheEvent::Invalidated(k) if k == key => invalidated += 1,
            _ => {}
        }
    }
    assert_eq!(updated, 1);
    assert_eq!(invalidated, 1);
}

#[tokio::test]
async fn test_failed_fetch_leaves_empty_state() {
    let (cache, _fetcher) = cache_with(16);
    let key = CacheKey::project(404);

    let result = cache.load(&key).await;
    assert!(result.unwrap_err().is_not_found());

    let snapshot = cache.read(&key);
    assert!(!snapshot.loading);
    assert!(snapshot.error.is_some());
    assert!(snapshot.is_empty_state());
}

#[tokio::test]
async fn test_rekey_moves_interest_and_keeps_old_fetch() {
    let (cache, fetcher) = cache_with(16);
    let all = CacheKey::deployments(None, None);
    let staging = CacheKey::deployments(
        None,
        Some(platform_models::Environment::Staging),
    );

    let gate = fetcher.gate();
    let mut subscription = cache.subscribe(all.clone());
    subscription.rekey(staging.clone());

    assert_eq!(cache.subscriber_count(&all), 0);
    assert_eq!(cache.subscriber_count(&staging), 1);
    assert_eq!(subscription.key(), &staging);

    gate.send(json!(["all"])).unwrap();
    subscription.load().await.unwrap();
    settle().await;

    assert_eq!(cache.peek(&all).unwrap().value.as_deref(), Some(&json!(["all"])));
    drop(subscription);
    assert_eq!(cache.subscriber_count(&staging), 0);
}

#[tokio::test]
async fn test_idle_entries_evicted_oldest_first() {
    let (cache, _fetcher) = cache_with(1);
    let observed = CacheKey::organizations();
    let a = CacheKey::project(1);
    let b = CacheKey::project(2);
    let c = CacheKey::project(3);

    let _subscription = cache.subscribe(observed.clone());
    cache.load(&observed).await.unwrap();
    cache.load(&a).await.unwrap();
    cache.load(&b).await.unwrap();
    cache.read(&c);

    assert!(cache.peek(&a).is_none());
    assert!(cache.peek(&b).is_some());
    assert!(cache.peek(&c).is_some());
    assert!(cache.peek(&observed).is_some());
}

#[tokio::test]
async fn test_clear_drops_everything() {
    let (cache, _fetcher) = cache_with(16);
    cache.load(&CacheKey::projects(None)).await.unwrap();
    cache.load(&CacheKey::organizations()).await.unwrap();
    assert_eq!(cache.len(), 2);

    cache.clear();
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_clear_discards_fetch_issued_before_it() {
    let (cache, fetcher) = cache_with(16);
    let key = CacheKey::projects(None);

    let before = fetcher.gate();
    let after = fetcher.gate();
    cache.read(&key);
    fetcher.wait_for_calls(1).await;

    // Signed out and in again while the first fetch is still out
    cache.clear();
    assert!(cache.read(&key).loading);
    fetcher.wait_for_calls(2).await;

    before.send(json!(["previous-identity"])).unwrap();
    settle().await;
    let snapshot = cache.read(&key);
    assert!(snapshot.value.is_none());
    assert!(snapshot.loading);

    drop(after);
    settle().await;
    let snapshot = cache.read(&key);
    assert!(snapshot.value.is_none());
    assert!(snapshot.error.is_some());
}

#[tokio::test]
async fn test_clear_keeps_observed_keys_registered() {
    let (cache, fetcher) = cache_with(16);
    let key = CacheKey::alerts(None, None, None);

    let _subscription = cache.subscribe(key.clone());
    cache.load(&key).await.unwrap();

    cache.clear();
    assert_eq!(cache.subscriber_count(&key), 1);
    assert!(cache.peek(&key).unwrap().is_empty_state());

    // Still observed, so an invalidation refetches right away
    cache.invalidate(&KeyPattern::from(Collection::Alerts));
    settle().await;
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(cache.peek(&key).unwrap().value.as_deref(), Some(&json!({ "call": 1 })));
}

#[tokio::test]
async fn test_load_refetches_idle_key_invalidated_while_waiting() {
    let (cache, fetcher) = cache_with(16);
    let key = CacheKey::servers(None);

    let old = fetcher.gate();
    let loader = {
        let cache = cache.clone();
        let key = key.clone();
        tokio::spawn(async move { cache.load(&key).await })
    };
    fetcher.wait_for_calls(1).await;

    // Nobody observes the key, so invalidating starts no fetch of its own
    cache.invalidate(&KeyPattern::Exact(key.clone()));
    old.send(json!(["before"])).unwrap();

    let value = loader.await.unwrap().unwrap();
    assert_eq!(*value, json!({ "call": 1 }));
    assert!(!cache.peek(&key).unwrap().stale);
}
