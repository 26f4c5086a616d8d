//! Composition root: wires the Persistent
//! Store, the config graph and its hot-reload watcher, the pooled HTTP
//! transport and its idle sweeper, the response cache and the outbound auth
//! manager into one [`GatewayService`], ready for a wire-protocol server
//! component to sit in front of. The binary that calls this (`mcpfusion-cli`)
//! owns signal handling and the shutdown coordinator; this module only
//! builds the graph.

use std::sync::Arc;
use std::time::Duration;

use mcpfusion_auth::AuthManager;
use mcpfusion_caching::{CacheConfig, ResponseCache};
use mcpfusion_config::loader::{watch_for_changes, ConfigHandle, ConfigLoader};
use mcpfusion_http::client::{run_idle_sweeper, HttpTransport};
use mcpfusion_interfaces::{AllowAllAuthorizer, Authorizer, Store};
use mcpfusion_resilience::retry::RetryPolicy;
use mcpfusion_resilience::ShutdownCoordinator;
use mcpfusion_storage::config::StorageConfig;
use mcpfusion_storage::sqlite::SqliteStore;

use crate::circuit::HostCircuitRegistry;
use crate::pipeline::http::HttpPipeline;
use crate::GatewayService;

const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(10);
const AUTH_CODE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Options sourced from CLI flags or the environment; everything else the
/// gateway needs is resolved internally.
#[derive(Default)]
pub struct BootstrapOptions {
    pub config_flag: Option<String>,
    pub authorizer: Option<Arc<dyn Authorizer>>,
}

pub async fn bootstrap(options: BootstrapOptions) -> anyhow::Result<Arc<GatewayService>> {
    let storage = StorageConfig::resolve();
    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&storage.db_path).await?);

    let shutdown = Arc::new(ShutdownCoordinator::new());
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(bridge_shutdown_signal(shutdown.clone(), shutdown_tx));

    let loader = Arc::new(ConfigLoader::resolve(options.config_flag.as_deref())?);
    let initial = loader.load()?;
    let config = ConfigHandle::new(initial);
    tokio::spawn(watch_for_changes(loader, config.clone(), CONFIG_POLL_INTERVAL));

    let transport = Arc::new(HttpTransport::with_defaults());
    let idle_sweeper = tokio::spawn(run_idle_sweeper(transport.clone(), shutdown_rx.clone()));

    let cache = Arc::new(ResponseCache::from_config(&CacheConfig::default()));
    cache.spawn_sweeper(Duration::from_secs(CacheConfig::default().sweep_interval_seconds), shutdown_rx.clone());

    let auth_code_sweeper = tokio::spawn(run_auth_code_sweeper(store.clone(), shutdown_rx.clone()));

    let auth = Arc::new(AuthManager::new(store.clone()));
    let circuits = Arc::new(HostCircuitRegistry::new());
    let http = HttpPipeline::new(transport, circuits, auth, cache, RetryPolicy::default());

    let authorizer = options.authorizer.unwrap_or_else(|| Arc::new(AllowAllAuthorizer));

    Ok(Arc::new(GatewayService {
        config,
        http,
        store,
        authorizer,
        shutdown,
        background: tokio::sync::Mutex::new(vec![idle_sweeper, auth_code_sweeper]),
    }))
}

/// Turns the coordinator's escalating broadcast signal into the plain `bool`
/// the sweep loops select on; they don't need to distinguish graceful from
/// forced, only "stop".
async fn bridge_shutdown_signal(coordinator: Arc<ShutdownCoordinator>, tx: tokio::sync::watch::Sender<bool>) {
    let mut rx = coordinator.subscribe();
    let _ = rx.recv().await;
    let _ = tx.send(true);
}

/// Periodically clears expired single-use auth-code handoffs; codes are
/// TTL-bound and must not accumulate in the Persistent Store.
async fn run_auth_code_sweeper(store: Arc<dyn Store>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(AUTH_CODE_SWEEP_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(err) = store.cleanup_expired_auth_codes().await {
                    tracing::warn!(%err, "auth-code cleanup sweep failed");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}
