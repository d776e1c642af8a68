//! Per-user bearer-token client cache (`spec.md` §4.D): a concurrent
//! TTL + LRU map from hashed tokens to initialised clients, with a
//! background sweeper and metrics callbacks.

use crate::hash::fingerprint;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_MAX_SIZE: usize = 100;
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Sink for cache observability events. Implementations must be cheap: the
/// cache invokes this off its internal lock (`spec.md` §5 "Metrics callbacks
/// off the critical path"), but a slow implementation still blocks whichever
/// caller triggered the event, so dispatch to a background task if your sink
/// can be slow.
pub trait CacheMetrics: Send + Sync {
    fn record_hit(&self) {}
    fn record_miss(&self) {}
    /// `reason` is `"expired"` or `"lru"`.
    fn record_eviction(&self, _reason: &'static str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
}

struct Node<C> {
    key: String,
    client: C,
    expires_at: Instant,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Intrusive doubly-linked recency list stored in a slab, `head` = MRU.
struct Inner<C> {
    index: std::collections::HashMap<String, usize>,
    nodes: Vec<Option<Node<C>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

enum Outcome<C> {
    Hit(C),
    MissAbsent,
    MissExpired,
}

impl<C: Clone> Inner<C> {
    fn new() -> Self {
        Self {
            index: std::collections::HashMap::new(),
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.nodes[idx].as_ref().unwrap();
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.nodes[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.nodes[idx].as_mut().unwrap();
            node.prev = None;
            node.next = old_head;
        }
        if let Some(h) = old_head {
            self.nodes[h].as_mut().unwrap().prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn remove_node(&mut self, idx: usize) -> Node<C> {
        self.detach(idx);
        let node = self.nodes[idx].take().unwrap();
        self.index.remove(&node.key);
        self.free.push(idx);
        node
    }

    /// Returns the evicted key/reason if `set` displaced an existing entry.
    fn insert_front(&mut self, key: String, client: C, expires_at: Instant, max_size: usize) -> Option<String> {
        let node = Node {
            key: key.clone(),
            client,
            expires_at,
            prev: None,
            next: None,
        };
        let idx = if let Some(free_idx) = self.free.pop() {
            self.nodes[free_idx] = Some(node);
            free_idx
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        };
        self.index.insert(key, idx);
        self.push_front(idx);

        if max_size > 0 && self.len() > max_size {
            let evict_idx = self.tail.expect("non-empty list has a tail");
            let evicted = self.remove_node(evict_idx);
            return Some(evicted.key);
        }
        None
    }

    fn get(&mut self, key: &str, now: Instant) -> Outcome<C> {
        let Some(&idx) = self.index.get(key) else {
            return Outcome::MissAbsent;
        };
        let expired = self.nodes[idx].as_ref().unwrap().expires_at <= now;
        if expired {
            self.remove_node(idx);
            return Outcome::MissExpired;
        }
        self.detach(idx);
        self.push_front(idx);
        let client = self.nodes[self.head.unwrap()].as_ref().unwrap().client.clone();
        Outcome::Hit(client)
    }

    fn remove_by_key(&mut self, key: &str) {
        if let Some(&idx) = self.index.get(key) {
            self.remove_node(idx);
        }
    }

    fn sweep_expired(&mut self, now: Instant) -> Vec<String> {
        let mut evicted = Vec::new();
        let mut cursor = self.tail;
        while let Some(idx) = cursor {
            let prev = self.nodes[idx].as_ref().unwrap().prev;
            if self.nodes[idx].as_ref().unwrap().expires_at <= now {
                let node = self.remove_node(idx);
                evicted.push(node.key);
            }
            cursor = prev;
        }
        evicted
    }

    fn clear(&mut self) {
        self.index.clear();
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }
}

/// Concurrent TTL + LRU cache mapping hashed bearer tokens to initialised
/// per-user clients.
pub struct ClientCache<C: Clone + Send + Sync + 'static> {
    inner: Arc<Mutex<Inner<C>>>,
    ttl: Duration,
    max_size: usize,
    metrics: Option<Arc<dyn CacheMetrics>>,
    stop: watch::Sender<bool>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<C: Clone + Send + Sync + 'static> ClientCache<C> {
    pub fn new() -> Self {
        Self::with_options(DEFAULT_TTL, DEFAULT_MAX_SIZE, None)
    }

    pub fn with_options(ttl: Duration, max_size: usize, metrics: Option<Arc<dyn CacheMetrics>>) -> Self {
        Self::with_sweep_interval(ttl, max_size, metrics, SWEEP_INTERVAL)
    }

    /// Exposed separately so tests can use a fast sweep interval; production
    /// callers should use [`ClientCache::with_options`].
    pub fn with_sweep_interval(
        ttl: Duration,
        max_size: usize,
        metrics: Option<Arc<dyn CacheMetrics>>,
        sweep_interval: Duration,
    ) -> Self {
        let inner = Arc::new(Mutex::new(Inner::new()));
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(sweep_loop(inner.clone(), sweep_interval, metrics.clone(), stop_rx));
        Self {
            inner,
            ttl,
            max_size,
            metrics,
            stop: stop_tx,
            sweeper: Mutex::new(Some(handle)),
        }
    }

    fn emit(&self, event: Event) {
        let Some(metrics) = &self.metrics else { return };
        match event {
            Event::Hit => metrics.record_hit(),
            Event::Miss => metrics.record_miss(),
            Event::Eviction(reason) => metrics.record_eviction(reason),
        }
    }

    /// Returns the cached client for `token` if present and unexpired.
    pub async fn get(&self, token: &str) -> Option<C> {
        let key = fingerprint(token.as_bytes());
        let now = Instant::now();
        let outcome = {
            let mut inner = self.inner.lock().await;
            inner.get(&key, now)
        };
        match outcome {
            Outcome::Hit(client) => {
                self.emit(Event::Hit);
                Some(client)
            }
            Outcome::MissAbsent => {
                self.emit(Event::Miss);
                None
            }
            Outcome::MissExpired => {
                self.emit(Event::Miss);
                self.emit(Event::Eviction("expired"));
                None
            }
        }
    }

    /// Inserts or refreshes the entry for `token`.
    pub async fn set(&self, token: &str, client: C) {
        let key = fingerprint(token.as_bytes());
        let expires_at = Instant::now() + self.ttl;
        let evicted = {
            let mut inner = self.inner.lock().await;
            inner.remove_by_key(&key);
            inner.insert_front(key, client, expires_at, self.max_size)
        };
        if evicted.is_some() {
            self.emit(Event::Eviction("lru"));
        }
    }

    pub async fn size(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.size().await,
            max_size: self.max_size,
        }
    }

    /// Stops the sweeper, waits for it to finish, then empties the cache.
    pub async fn close(&self) {
        let _ = self.stop.send(true);
        let handle = self.sweeper.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.inner.lock().await.clear();
    }
}

impl<C: Clone + Send + Sync + 'static> Default for ClientCache<C> {
    fn default() -> Self {
        Self::new()
    }
}

enum Event {
    Hit,
    Miss,
    Eviction(&'static str),
}

async fn sweep_loop<C: Clone + Send + Sync + 'static>(
    inner: Arc<Mutex<Inner<C>>>,
    interval: Duration,
    metrics: Option<Arc<dyn CacheMetrics>>,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // first tick fires immediately; skip it
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = {
                    let mut guard = inner.lock().await;
                    guard.sweep_expired(Instant::now())
                };
                if let Some(metrics) = &metrics {
                    for _ in &evicted {
                        metrics.record_eviction("expired");
                    }
                }
            }
            _ = stop.changed() => {
                if *stop.borrow() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingMetrics {
        hits: AtomicUsize,
        misses: AtomicUsize,
        expired: AtomicUsize,
        lru: AtomicUsize,
    }

    impl CacheMetrics for CountingMetrics {
        fn record_hit(&self) {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
        fn record_miss(&self) {
            self.misses.fetch_add(1, Ordering::SeqCst);
        }
        fn record_eviction(&self, reason: &'static str) {
            match reason {
                "expired" => self.expired.fetch_add(1, Ordering::SeqCst),
                "lru" => self.lru.fetch_add(1, Ordering::SeqCst),
                _ => 0,
            };
        }
    }

    #[tokio::test]
    async fn lru_displacement_matches_scenario() {
        let cache: ClientCache<&'static str> =
            ClientCache::with_options(Duration::from_secs(3600), 3, None);
        cache.set("A", "A").await;
        cache.set("B", "B").await;
        cache.set("C", "C").await;
        assert_eq!(cache.get("A").await, Some("A")); // promotes A
        cache.set("D", "D").await; // evicts B (LRU at insertion time)

        assert_eq!(cache.get("A").await, Some("A"));
        assert_eq!(cache.get("B").await, None);
        assert_eq!(cache.get("C").await, Some("C"));
        assert_eq!(cache.get("D").await, Some("D"));
        cache.close().await;
    }

    #[tokio::test]
    async fn ttl_expiration_evicts_with_reason() {
        let metrics = Arc::new(CountingMetrics::default());
        let cache: ClientCache<&'static str> = ClientCache::with_sweep_interval(
            Duration::from_millis(50),
            10,
            Some(metrics.clone()),
            Duration::from_secs(3600),
        );
        cache.set("X", "X").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.get("X").await, None);
        assert_eq!(metrics.expired.load(Ordering::SeqCst), 1);
        cache.close().await;
    }

    #[tokio::test]
    async fn set_then_get_same_task_hits_before_ttl() {
        let cache: ClientCache<&'static str> = ClientCache::with_options(Duration::from_secs(60), 10, None);
        cache.set("k", "v").await;
        assert_eq!(cache.get("k").await, Some("v"));
        cache.close().await;
    }

    #[tokio::test]
    async fn background_sweeper_evicts_without_a_get() {
        let metrics = Arc::new(CountingMetrics::default());
        let cache: ClientCache<&'static str> = ClientCache::with_sweep_interval(
            Duration::from_millis(20),
            10,
            Some(metrics.clone()),
            Duration::from_millis(10),
        );
        cache.set("Y", "Y").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.size().await, 0);
        assert!(metrics.expired.load(Ordering::SeqCst) >= 1);
        cache.close().await;
    }

    #[tokio::test]
    async fn map_and_list_invariants_hold_under_churn() {
        let cache: ClientCache<usize> = ClientCache::with_options(Duration::from_secs(3600), 5, None);
        for i in 0..50 {
            cache.set(&i.to_string(), i).await;
            assert!(cache.size().await <= 5);
        }
        let stats = cache.stats().await;
        assert_eq!(stats.max_size, 5);
        assert!(stats.size <= 5);
        cache.close().await;
    }
}
