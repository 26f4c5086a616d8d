//! Per-endpoint response cache: keyed on
//! `(tenant, endpoint_id, canonicalized_args)`, hit bypasses auth and the
//! network entirely, miss writes through after a successful upstream call.

use serde_json::Value as JsonValue;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::Cache;
use crate::config::{CacheConfig, CacheType};
use crate::stores::InMemoryCache;
#[cfg(feature = "lru")]
use crate::stores::LruCache;
#[cfg(feature = "moka")]
use crate::stores::MokaCache;
#[cfg(feature = "ttl")]
use crate::stores::TtlCache;
use crate::{CacheResult, CacheStats};

/// Cache key for a single endpoint invocation.
///
/// `args_hash` hashes the bound argument `JsonValue` directly via its native
/// `Hash` impl rather than serializing to a string first, so key order and
/// float formatting quirks in a pretty-printed encoding can't desync two
/// otherwise-identical calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseCacheKey {
    pub tenant: String,
    pub endpoint_id: String,
    args_hash: u64,
}

impl ResponseCacheKey {
    pub fn new(tenant: impl Into<String>, endpoint_id: impl Into<String>, args: &JsonValue) -> Self {
        let mut hasher = DefaultHasher::new();
        args.hash(&mut hasher);
        Self {
            tenant: tenant.into(),
            endpoint_id: endpoint_id.into(),
            args_hash: hasher.finish(),
        }
    }
}

/// A cached upstream response, stored after a write-through on cache miss.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: JsonValue,
}

impl CachedResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: JsonValue) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }
}

enum Backend {
    InMemory(InMemoryCache<ResponseCacheKey, CachedResponse>),
    #[cfg(feature = "lru")]
    Lru(LruCache<ResponseCacheKey, CachedResponse>),
    #[cfg(feature = "ttl")]
    Ttl(Arc<TtlCache<ResponseCacheKey, CachedResponse>>),
    #[cfg(feature = "moka")]
    Moka(MokaCache<ResponseCacheKey, CachedResponse>),
}

/// Concurrent-safe, endpoint-scoped response cache with a TTL sweep
/// background task when the `Ttl` backend is selected.
pub struct ResponseCache {
    backend: Backend,
    default_ttl: Duration,
}

impl ResponseCache {
    pub fn from_config(config: &CacheConfig) -> Self {
        let default_ttl = Duration::from_secs(config.default_ttl_seconds);
        let backend = match config.backend {
            CacheType::InMemory => Backend::InMemory(InMemoryCache::with_capacity(config.max_entries)),
            #[cfg(feature = "lru")]
            CacheType::Lru => Backend::Lru(LruCache::new(config.max_entries.max(1))),
            #[cfg(not(feature = "lru"))]
            CacheType::Lru => Backend::InMemory(InMemoryCache::with_capacity(config.max_entries)),
            #[cfg(feature = "ttl")]
            CacheType::Ttl => Backend::Ttl(Arc::new(TtlCache::with_capacity(default_ttl, config.max_entries))),
            #[cfg(not(feature = "ttl"))]
            CacheType::Ttl => Backend::InMemory(InMemoryCache::with_capacity(config.max_entries)),
            #[cfg(feature = "moka")]
            CacheType::Moka => Backend::Moka(
                MokaCache::builder()
                    .max_capacity(config.max_entries as u64)
                    .time_to_live(default_ttl)
                    .build(),
            ),
            #[cfg(not(feature = "moka"))]
            CacheType::Moka => Backend::InMemory(InMemoryCache::with_capacity(config.max_entries)),
        };
        Self { backend, default_ttl }
    }

    pub async fn get(&self, key: &ResponseCacheKey) -> CacheResult<Option<CachedResponse>> {
        match &self.backend {
            Backend::InMemory(c) => c.get(key).await,
            #[cfg(feature = "lru")]
            Backend::Lru(c) => c.get(key).await,
            #[cfg(feature = "ttl")]
            Backend::Ttl(c) => c.get(key).await,
            #[cfg(feature = "moka")]
            Backend::Moka(c) => c.get(key).await,
        }
    }

    /// Writes through on a cache miss. `ttl` overrides the configured default
    /// when the endpoint carries its own `ttl_seconds`.
    pub async fn put(&self, key: ResponseCacheKey, value: CachedResponse, ttl: Option<Duration>) -> CacheResult<()> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        match &self.backend {
            Backend::InMemory(c) => c.put_with_ttl(key, value, ttl).await,
            #[cfg(feature = "lru")]
            Backend::Lru(c) => c.put_with_ttl(key, value, ttl).await,
            #[cfg(feature = "ttl")]
            Backend::Ttl(c) => c.put_with_ttl(key, value, ttl).await,
            #[cfg(feature = "moka")]
            Backend::Moka(c) => c.put_with_ttl(key, value, ttl).await,
        }
    }

    pub async fn remove(&self, key: &ResponseCacheKey) -> CacheResult<Option<CachedResponse>> {
        match &self.backend {
            Backend::InMemory(c) => c.remove(key).await,
            #[cfg(feature = "lru")]
            Backend::Lru(c) => c.remove(key).await,
            #[cfg(feature = "ttl")]
            Backend::Ttl(c) => c.remove(key).await,
            #[cfg(feature = "moka")]
            Backend::Moka(c) => c.remove(key).await,
        }
    }

    pub async fn clear(&self) -> CacheResult<()> {
        match &self.backend {
            Backend::InMemory(c) => c.clear().await,
            #[cfg(feature = "lru")]
            Backend::Lru(c) => c.clear().await,
            #[cfg(feature = "ttl")]
            Backend::Ttl(c) => c.clear().await,
            #[cfg(feature = "moka")]
            Backend::Moka(c) => c.clear().await,
        }
    }

    pub async fn stats(&self) -> CacheResult<CacheStats> {
        match &self.backend {
            Backend::InMemory(c) => c.stats().await,
            #[cfg(feature = "lru")]
            Backend::Lru(c) => c.stats().await,
            #[cfg(feature = "ttl")]
            Backend::Ttl(c) => c.stats().await,
            #[cfg(feature = "moka")]
            Backend::Moka(c) => c.stats().await,
        }
    }

    /// Spawns the TTL backend's sweep task; a no-op for other backends, which
    /// either sweep lazily on access (`InMemory`, `Lru`) or manage their own
    /// expiry internally (`Moka`). The task exits once `shutdown` reports
    /// `true`.
    pub fn spawn_sweeper(&self, interval: Duration, shutdown: tokio::sync::watch::Receiver<bool>) {
        #[cfg(feature = "ttl")]
        if let Backend::Ttl(c) = &self.backend {
            c.clone().start_cleanup_task(interval, shutdown);
            return;
        }
        #[cfg(not(feature = "ttl"))]
        {
            let _ = (interval, shutdown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_args_produce_identical_keys() {
        let args = json!({"owner": "acme", "repo": "widgets"});
        let a = ResponseCacheKey::new("tenant-a", "list_issues", &args);
        let b = ResponseCacheKey::new("tenant-a", "list_issues", &args);
        assert_eq!(a, b);
    }

    #[test]
    fn different_tenants_produce_different_keys() {
        let args = json!({"owner": "acme"});
        let a = ResponseCacheKey::new("tenant-a", "list_issues", &args);
        let b = ResponseCacheKey::new("tenant-b", "list_issues", &args);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn cache_roundtrip_with_default_backend() {
        let cache = ResponseCache::from_config(&CacheConfig::default());
        let key = ResponseCacheKey::new("tenant-a", "get_repo", &json!({"id": 1}));

        assert!(cache.get(&key).await.unwrap().is_none());

        let response = CachedResponse::new(200, vec![], json!({"id": 1, "name": "widgets"}));
        cache.put(key.clone(), response, None).await.unwrap();

        let hit = cache.get(&key).await.unwrap();
        assert_eq!(hit.unwrap().status, 200);
    }

    #[tokio::test]
    async fn per_call_ttl_overrides_default() {
        let mut config = CacheConfig::default();
        config.default_ttl_seconds = 60;
        let cache = ResponseCache::from_config(&config);
        let key = ResponseCacheKey::new("tenant-a", "get_repo", &json!({"id": 2}));

        cache
            .put(
                key.clone(),
                CachedResponse::new(200, vec![], json!({})),
                Some(Duration::from_millis(20)),
            )
            .await
            .unwrap();
        assert!(cache.get(&key).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.get(&key).await.unwrap().is_none());
    }
}
