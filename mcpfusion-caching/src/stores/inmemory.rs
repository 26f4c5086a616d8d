//! Simple in-memory cache implementation

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    cache::{Cache, CacheEntry, CacheKey, CacheValue},
    stats::{create_stats_collector, SharedStatsCollector},
    CacheResult, CacheStats,
};

/// Simple in-memory cache
pub struct InMemoryCache<K, V> {
    store: Arc<RwLock<HashMap<K, CacheEntry<V>>>>,
    stats: SharedStatsCollector,
}

impl<K: CacheKey + 'static, V: CacheValue + 'static> InMemoryCache<K, V> {
    /// Create a new in-memory cache
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            stats: create_stats_collector(),
        }
    }

    /// Create with initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::with_capacity(capacity))),
            stats: create_stats_collector(),
        }
    }
}

impl<K: CacheKey + 'static, V: CacheValue + 'static> Default for InMemoryCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K: CacheKey + 'static, V: CacheValue + 'static> Cache<K, V> for InMemoryCache<K, V> {
    async fn get(&self, key: &K) -> CacheResult<Option<V>> {
        let start = std::time::Instant::now();

        let result = {
            let mut store = self.store.write();
            match store.get_mut(key) {
                Some(entry) => {
                    if entry.is_expired() {
                        store.remove(key);
                        self.stats.record_miss();
                        None
                    } else {
                        entry.record_access();
                        self.stats.record_hit();
                        Some(entry.value.clone())
                    }
                }
                None => {
                    self.stats.record_miss();
                    None
                }
            }
        };

        let latency_ns = start.elapsed().as_nanos() as u64;
        self.stats.record_get_latency(latency_ns);

        Ok(result)
    }

    async fn put(&self, key: K, value: V) -> CacheResult<()> {
        let start = std::time::Instant::now();

        {
            let mut store = self.store.write();
            store.insert(key, CacheEntry::new(value));
            self.stats.record_put();
        }

        let latency_ns = start.elapsed().as_nanos() as u64;
        self.stats.record_put_latency(latency_ns);

        Ok(())
    }

    async fn put_with_ttl(&self, key: K, value: V, ttl: std::time::Duration) -> CacheResult<()> {
        let start = std::time::Instant::now();

        {
            let mut store = self.store.write();
            store.insert(key, CacheEntry::with_ttl(value, ttl));
            self.stats.record_put();
        }

        let latency_ns = start.elapsed().as_nanos() as u64;
        self.stats.record_put_latency(latency_ns);

        Ok(())
    }

    async fn remove(&self, key: &K) -> CacheResult<Option<V>> {
        let mut store = self.store.write();
        match store.remove(key) {
            Some(entry) => {
                if entry.is_expired() {
                    Ok(None)
                } else {
                    Ok(Some(entry.value))
                }
            }
            None => Ok(None),
        }
    }

    async fn clear(&self) -> CacheResult<()> {
        let mut store = self.store.write();
        let count = store.len();
        store.clear();

        // Record evictions
        for _ in 0..count {
            self.stats.record_eviction();
        }

        Ok(())
    }

    async fn len(&self) -> CacheResult<usize> {
        let store = self.store.read();

        // Count non-expired entries
        let count = store.values().filter(|entry| !entry.is_expired()).count();

        Ok(count)
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let len = self.len().await?;
        Ok(self.stats.get_stats(len, None))
    }
}
