//! Pooled transport configuration.

use std::time::Duration;

/// Limits and timeouts for the shared pooled HTTP client.
///
/// `max_idle_total` and `max_conns_per_host` record the configured connection
/// budget but `reqwest`/`hyper` only expose a per-host idle-pool size, not a
/// hard cap on open connections — they're carried here for documentation and
/// future enforcement via a semaphore, not wired into the `reqwest::ClientBuilder`.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub max_idle_total: usize,
    pub max_idle_per_host: usize,
    pub max_conns_per_host: usize,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
    pub default_timeout: Duration,
    pub keepalive_probe: Duration,
    pub sweep_interval: Duration,
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            max_idle_total: 100,
            max_idle_per_host: 10,
            max_conns_per_host: 50,
            idle_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            default_timeout: Duration::from_secs(60),
            keepalive_probe: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(5 * 60),
            user_agent: "mcpfusion/1.0".to_string(),
        }
    }
}
