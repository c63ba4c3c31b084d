//! Read-through cache for KPI/forecast results (spec §4.7, §5).
//!
//! Keyed by `{tenant, kpi, filter_fingerprint, window}`, bounded by LRU
//! eviction, with single-flight so concurrent misses on the same key
//! share one computation instead of stampeding the KPI engine.

use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub tenant: String,
    pub kpi: String,
    pub filter_fingerprint: String,
    pub window: String,
}

impl CacheKey {
    /// Pattern-match invalidation target `"<tenant>:<kpi>:*"` (spec §5).
    pub fn prefix(&self) -> String {
        format!("{}:{}:", self.tenant, self.kpi)
    }

    fn matches_prefix(&self, prefix: &str) -> bool {
        self.prefix() == prefix
    }
}

struct Inflight {
    notify: Arc<Notify>,
}

pub struct ReadThroughCache<V: Clone + Send + Sync + 'static> {
    store: Mutex<LruCache<CacheKey, V>>,
    inflight: Mutex<HashMap<CacheKey, Inflight>>,
}

impl<V: Clone + Send + Sync + 'static> ReadThroughCache<V> {
    pub fn new(max_entries: usize) -> Self {
        let cap = NonZeroUsize::new(max_entries.max(1)).unwrap();
        ReadThroughCache {
            store: Mutex::new(LruCache::new(cap)),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value, or computes it via `compute` — with
    /// concurrent callers for the same key sharing one computation
    /// (single-flight).
    pub async fn get_or_compute<F, Fut>(&self, key: CacheKey, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(hit) = self.store.lock().get(&key).cloned() {
            return hit;
        }

        let notify = {
            let mut inflight = self.inflight.lock();
            if let Some(existing) = inflight.get(&key) {
                Some(existing.notify.clone())
            } else {
                inflight.insert(
                    key.clone(),
                    Inflight {
                        notify: Arc::new(Notify::new()),
                    },
                );
                None
            }
        };

        if let Some(notify) = notify {
            notify.notified().await;
            if let Some(hit) = self.store.lock().get(&key).cloned() {
                return hit;
            }
        }

        let value = compute().await;
        self.store.lock().put(key.clone(), value.clone());
        if let Some(entry) = self.inflight.lock().remove(&key) {
            entry.notify.notify_waiters();
        }
        value
    }

    /// Evicts every key whose `"<tenant>:<kpi>:"` prefix matches —
    /// invoked on KPI-affecting events (spec §4.7).
    pub fn invalidate_prefix(&self, prefix: &str) {
        let mut store = self.store.lock();
        let stale: Vec<CacheKey> = store
            .iter()
            .filter(|(k, _)| k.matches_prefix(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        for key in stale {
            store.pop(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn concurrent_misses_share_one_computation() {
        let cache = Arc::new(ReadThroughCache::<i64>::new(100));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey {
            tenant: "C1".into(),
            kpi: "efficiency".into(),
            filter_fingerprint: "fp".into(),
            window: "2026-01".into(),
        };

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(key, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        42
                    })
                    .await
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_prefix_drops_matching_keys() {
        let cache = ReadThroughCache::<i64>::new(100);
        let key = CacheKey {
            tenant: "C1".into(),
            kpi: "efficiency".into(),
            filter_fingerprint: "fp".into(),
            window: "2026-01".into(),
        };
        cache.get_or_compute(key.clone(), || async { 1 }).await;
        cache.invalidate_prefix(&key.prefix());
        let mut calls = 0;
        cache
            .get_or_compute(key, || async {
                calls += 1;
                2
            })
            .await;
        assert_eq!(calls, 1);
    }
}
