//! Response caching for the request pipeline: a unified
//! cache trait with swappable backends, plus the endpoint-scoped response
//! cache built on top of it.

pub mod cache;
pub mod config;
pub mod errors;
pub mod response_cache;
pub mod stats;
pub mod stores;

// Re-export main types
pub use cache::{Cache, CacheKey, CacheValue};
pub use config::{CacheConfig, CacheType};
pub use errors::{CacheError, CacheResult};
pub use response_cache::{CachedResponse, ResponseCache, ResponseCacheKey};
pub use stats::CacheStats;

// Re-export store implementations
pub use stores::InMemoryCache;

#[cfg(feature = "lru")]
pub use stores::LruCache;

#[cfg(feature = "ttl")]
pub use stores::TtlCache;

#[cfg(feature = "moka")]
pub use stores::MokaCache;

/// Create a default in-memory cache
pub fn create_default_cache<K, V>() -> impl Cache<K, V>
where
    K: CacheKey + 'static,
    V: CacheValue + 'static,
{
    InMemoryCache::new()
}

/// Create an LRU cache with specified capacity
#[cfg(feature = "lru")]
pub fn create_lru_cache<K, V>(capacity: usize) -> impl Cache<K, V>
where
    K: CacheKey + 'static,
    V: CacheValue + 'static,
{
    LruCache::new(capacity)
}

/// Create a TTL-based cache with default TTL
#[cfg(feature = "ttl")]
pub fn create_ttl_cache<K, V>(default_ttl: std::time::Duration) -> impl Cache<K, V>
where
    K: CacheKey + 'static,
    V: CacheValue + 'static,
{
    TtlCache::new(default_ttl)
}

/// Create a high-performance Moka-based cache
#[cfg(feature = "moka")]
pub fn create_moka_cache<K, V>(max_capacity: u64) -> impl Cache<K, V>
where
    K: CacheKey + Send + Sync + 'static,
    V: CacheValue + Send + Sync + 'static,
{
    MokaCache::new(max_capacity)
}