//! Entity query cache
//!
//! A key-subscription registry: each [`CacheKey`] maps to the last fetched
//! server response, a staleness marker, the in-flight fetch (shared by every
//! concurrent reader) and a subscriber count. Entries change only when a
//! fetch completes; mutations never write into the cache, they invalidate.
//!
//! Request ids and invalidation markers come from one monotonic sequence.
//! An entry is stale while its last invalidation is newer than the request
//! whose result it holds, and a completion older than the applied one is
//! discarded, so the newest request always wins regardless of completion
//! order.
//!
//! Clearing the cache records a marker from the same sequence; any fetch
//! issued before it is discarded when it completes, whatever entry it finds.
//!
//! Fetches are driven by spawned tasks; calling [`QueryCache::read`] or
//! [`QueryCache::invalidate`] requires a tokio runtime context.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::cache::key::{CacheKey, KeyPattern};
use crate::errors::ConsoleError;
use crate::utils::content_digest;

/// Outcome of one fetch, cloneable so every joined reader receives it
pub type FetchResult = Result<Arc<Value>, Arc<ConsoleError>>;

type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Source of truth behind the cache
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, key: &CacheKey) -> Result<Value, ConsoleError>;
}

/// Change notifications for subscribed views
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// A fetch delivered content different from what the entry held
    Updated(CacheKey),
    /// A fetch failed; the entry keeps its previous value, if any
    Failed(CacheKey),
    /// The entry was marked stale
    Invalidated(CacheKey),
}

/// What a view sees when it reads a key
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub value: Option<Arc<Value>>,
    pub loading: bool,
    pub stale: bool,
    pub error: Option<Arc<ConsoleError>>,
}

impl Snapshot {
    /// Nothing to show and nothing coming: render the empty state
    pub fn is_empty_state(&self) -> bool {
        self.value.is_none() && !self.loading
    }
}

struct InFlight {
    request: u64,
    fetch: SharedFetch,
}

struct Entry {
    value: Option<Arc<Value>>,
    digest: Option<String>,
    error: Option<Arc<ConsoleError>>,
    applied_request: u64,
    invalidated_at: u64,
    in_flight: Option<InFlight>,
    subscribers: usize,
    last_used: u64,
}

impl Entry {
    fn new(now: u64) -> Self {
        Self {
            value: None,
            digest: None,
            error: None,
            applied_request: 0,
            invalidated_at: 0,
            in_flight: None,
            subscribers: 0,
            last_used: now,
        }
    }

    fn is_stale(&self) -> bool {
        self.invalidated_at > self.applied_request
    }

    fn is_fresh(&self) -> bool {
        self.value.is_some() && self.error.is_none() && !self.is_stale()
    }

    fn needs_fetch(&self) -> bool {
        (self.value.is_none() && self.error.is_none()) || self.is_stale()
    }

    /// Forget everything fetched; interest in the key is kept
    fn reset(&mut self) {
        self.value = None;
        self.digest = None;
        self.error = None;
        self.applied_request = 0;
        self.invalidated_at = 0;
        self.in_flight = None;
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            value: self.value.clone(),
            loading: self.in_flight.is_some(),
            stale: self.is_stale(),
            error: self.error.clone(),
        }
    }
}

struct Inner {
    fetcher: Arc<dyn Fetcher>,
    entries: Mutex<HashMap<CacheKey, Entry>>,
    seq: AtomicU64,
    cleared_at: AtomicU64,
    idle_capacity: usize,
    events: broadcast::Sender<CacheEvent>,
}

/// Keyed, reactive read cache
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl QueryCache {
    /// Create a cache keeping at most `idle_capacity` unobserved entries
    pub fn new(fetcher: Arc<dyn Fetcher>, idle_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Inner {
                fetcher,
                entries: Mutex::new(HashMap::new()),
                seq: AtomicU64::new(0),
                cleared_at: AtomicU64::new(0),
                idle_capacity,
                events,
            }),
        }
    }

    /// Last known value for `key`, starting a fetch if it is absent or stale
    pub fn read(&self, key: &CacheKey) -> Snapshot {
        let mut entries = self.inner.lock();
        let now = self.inner.next_seq();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(now));
        entry.last_used = now;

        if entry.needs_fetch() && entry.in_flight.is_none() {
            self.inner.start_fetch(key, entry);
        }
        let snapshot = entry.snapshot();
        self.inner.evict_idle(&mut entries);
        snapshot
    }

    /// Current state of `key` without triggering anything
    pub fn peek(&self, key: &CacheKey) -> Option<Snapshot> {
        self.inner.lock().get(key).map(Entry::snapshot)
    }

    /// Wait for a value that is current as of this call.
    ///
    /// Joins the in-flight fetch if there is one. If the key is invalidated
    /// or the cache cleared while waiting, fetches again until the entry
    /// holds a result no newer invalidation has marked stale.
    pub async fn load(&self, key: &CacheKey) -> FetchResult {
        loop {
            let (request, fetch) = {
                let mut entries = self.inner.lock();
                let now = self.inner.next_seq();
                let entry = entries
                    .entry(key.clone())
                    .or_insert_with(|| Entry::new(now));
                entry.last_used = now;

                if entry.is_fresh() && entry.in_flight.is_none() {
                    if let Some(value) = &entry.value {
                        return Ok(value.clone());
                    }
                }
                match &entry.in_flight {
                    Some(in_flight) => (in_flight.request, in_flight.fetch.clone()),
                    None => {
                        let fetch = self.inner.start_fetch(key, entry);
                        let request = entry.in_flight.as_ref().map(|f| f.request).unwrap_or(0);
                        (request, fetch)
                    }
                }
            };

            let result = fetch.await;

            if self.inner.is_cleared(request) {
                trace!("Fetch for {} predates a cache clear, fetching again", key);
                continue;
            }

            let entries = self.inner.lock();
            match entries.get(key) {
                Some(entry) if entry.is_stale() => {
                    trace!("Fetch for {} superseded, fetching the newer value", key);
                }
                // A newer request may have completed first; the entry holds the winner
                Some(entry) if result.is_ok() && entry.error.is_none() => {
                    return entry.value.clone().map(Ok).unwrap_or(result);
                }
                _ => return result,
            }
        }
    }

    /// Mark every entry matching `pattern` stale.
    ///
    /// Observed entries refetch immediately, superseding any fetch already in
    /// flight; unobserved ones refetch on their next read. Returns the number
    /// of entries marked.
    pub fn invalidate(&self, pattern: &KeyPattern) -> usize {
        let mut entries = self.inner.lock();
        let marker = self.inner.next_seq();
        let mut marked = 0;

        for (key, entry) in entries.iter_mut().filter(|(key, _)| pattern.matches(key)) {
            entry.invalidated_at = marker;
            marked += 1;
            let _ = self.inner.events.send(CacheEvent::Invalidated(key.clone()));

            if entry.subscribers > 0 {
                debug!("Invalidated observed key {}, refetching", key);
                self.inner.start_fetch(key, entry);
            } else {
                debug!("Invalidated idle key {}", key);
            }
        }
        marked
    }

    /// Observe `key` until the returned guard is dropped
    pub fn subscribe(&self, key: CacheKey) -> Subscription {
        self.acquire(&key);
        Subscription {
            cache: self.clone(),
            key,
        }
    }

    /// Change notifications
    pub fn events(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    /// Forget every fetched value.
    ///
    /// Unobserved entries are dropped; observed ones stay registered with no
    /// value and fetch again on their next read. Fetches still in flight are
    /// discarded on completion.
    pub fn clear(&self) {
        let mut entries = self.inner.lock();
        let marker = self.inner.next_seq();
        self.inner.cleared_at.store(marker, Ordering::SeqCst);
        debug!("Clearing {} cache entries (marker {})", entries.len(), marker);

        entries.retain(|_, entry| entry.subscribers > 0);
        for entry in entries.values_mut() {
            entry.reset();
        }
    }

    /// Number of subscribers currently observing `key`
    pub fn subscriber_count(&self, key: &CacheKey) -> usize {
        self.inner
            .lock()
            .get(key)
            .map(|entry| entry.subscribers)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn acquire(&self, key: &CacheKey) {
        let mut entries = self.inner.lock();
        let now = self.inner.next_seq();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(now));
        entry.subscribers += 1;
        entry.last_used = now;

        if entry.needs_fetch() && entry.in_flight.is_none() {
            self.inner.start_fetch(key, entry);
        }
    }

    fn release(&self, key: &CacheKey) {
        let mut entries = self.inner.lock();
        if let Some(entry) = entries.get_mut(key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
        }
        self.inner.evict_idle(&mut entries);
    }
}

impl Inner {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `request` was issued before the last clear
    fn is_cleared(&self, request: u64) -> bool {
        request <= self.cleared_at.load(Ordering::SeqCst)
    }

    /// Issue a new request for `key`, replacing any in-flight one as the
    /// entry's current fetch
    fn start_fetch(self: &Arc<Self>, key: &CacheKey, entry: &mut Entry) -> SharedFetch {
        let request = self.next_seq();
        debug!("Fetching {} (request {})", key, request);

        let inner = self.clone();
        let fetch_key = key.clone();
        let fetch = async move {
            let result = inner
                .fetcher
                .fetch(&fetch_key)
                .await
                .map(Arc::new)
                .map_err(Arc::new);
            inner.complete(&fetch_key, request, &result);
            result
        }
        .boxed()
        .shared();

        entry.in_flight = Some(InFlight {
            request,
            fetch: fetch.clone(),
        });

        // Drive the fetch even if no reader awaits it
        tokio::spawn(fetch.clone().map(|_| ()));
        fetch
    }

    fn complete(&self, key: &CacheKey, request: u64, result: &FetchResult) {
        let mut entries = self.lock();
        if self.is_cleared(request) {
            debug!("Discarding result for {} issued before clear (request {})", key, request);
            return;
        }
        let Some(entry) = entries.get_mut(key) else {
            debug!("Discarding result for evicted key {} (request {})", key, request);
            return;
        };

        if entry.in_flight.as_ref().map(|f| f.request) == Some(request) {
            entry.in_flight = None;
        }

        if request <= entry.applied_request {
            debug!(
                "Discarding out-of-order result for {} (request {} <= applied {})",
                key, request, entry.applied_request
            );
            return;
        }
        entry.applied_request = request;

        match result {
            Ok(value) => {
                let digest = content_digest(value);
                let changed = entry.digest.as_deref() != Some(digest.as_str());
                entry.value = Some(value.clone());
                entry.digest = Some(digest);
                entry.error = None;
                if changed {
                    let _ = self.events.send(CacheEvent::Updated(key.clone()));
                }
            }
            Err(e) => {
                warn!("Fetch for {} failed: {}", key, e);
                entry.error = Some(e.clone());
                let _ = self.events.send(CacheEvent::Failed(key.clone()));
            }
        }
    }

    /// Evict the least recently used unobserved entries beyond capacity
    fn evict_idle(&self, entries: &mut HashMap<CacheKey, Entry>) {
        let mut idle: Vec<(u64, CacheKey)> = entries
            .iter()
            .filter(|(_, e)| e.subscribers == 0 && e.in_flight.is_none())
            .map(|(k, e)| (e.last_used, k.clone()))
            .collect();

        if idle.len() <= self.idle_capacity {
            return;
        }

        idle.sort();
        let excess = idle.len() - self.idle_capacity;
        for (_, key) in idle.into_iter().take(excess) {
            trace!("Evicting idle key {}", key);
            entries.remove(&key);
        }
    }
}

/// Interest of one view in one key
pub struct Subscription {
    cache: QueryCache,
    key: CacheKey,
}

impl Subscription {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn read(&self) -> Snapshot {
        self.cache.read(&self.key)
    }

    pub async fn load(&self) -> FetchResult {
        self.cache.load(&self.key).await
    }

    /// Switch to a new key (e.g. after a filter change).
    ///
    /// Interest in the old key ends; its entry and any fetch in flight for it
    /// are left alone.
    pub fn rekey(&mut self, key: CacheKey) {
        if key == self.key {
            return;
        }
        self.cache.acquire(&key);
        let old = std::mem::replace(&mut self.key, key);
        self.cache.release(&old);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cache.release(&self.key);
    }
}
