//! Response cache configuration.

use serde::{Deserialize, Serialize};

/// Top-level response cache configuration, distinct from the per-endpoint
/// `ttl_seconds` toggle carried on each endpoint's own config — this governs
/// the *backend* shared by every endpoint that opts into caching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Master switch; when false the request pipeline skips the cache
    /// lookup/write-through entirely regardless of per-endpoint settings.
    pub enabled: bool,

    /// Backend used to store cached responses.
    pub backend: CacheType,

    /// Maximum entries held by capacity-bounded backends (`Lru`, `Moka`).
    pub max_entries: usize,

    /// Maximum response body size eligible for caching, in bytes.
    pub max_response_size: usize,

    /// Fallback TTL applied when an endpoint doesn't set its own.
    pub default_ttl_seconds: u64,

    /// Interval between `TtlCache` sweep passes.
    pub sweep_interval_seconds: u64,

    pub collect_stats: bool,
}

/// Cache backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    /// Unbounded in-memory map, no eviction beyond TTL expiry.
    InMemory,
    /// Fixed-capacity least-recently-used eviction.
    Lru,
    /// TTL-tracked map with a background sweep task.
    Ttl,
    /// `moka`-backed concurrent cache with built-in expiry and eviction.
    Moka,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheType::Ttl,
            max_entries: 2000,
            max_response_size: 1024 * 1024,
            default_ttl_seconds: 300,
            sweep_interval_seconds: 60,
            collect_stats: true,
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}
