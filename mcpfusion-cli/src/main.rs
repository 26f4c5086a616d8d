//! Process entry point. Loads the env file, parses flags,
//! and either runs a single admin action against the Persistent Store and
//! exits, or bootstraps the gateway and keeps the process alive.

mod admin;
mod cli;
mod logging;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;

use cli::Cli;
use mcpfusion_config::envfile;
use mcpfusion_config::loader::ConfigLoader;
use mcpfusion_server::bootstrap::{bootstrap, BootstrapOptions};
use mcpfusion_storage::config::StorageConfig;
use mcpfusion_storage::sqlite::SqliteStore;

#[tokio::main]
async fn main() -> Result<()> {
    envfile::load();

    let Cli { config, port, debug, no_auth, command } = Cli::parse();

    if let Some(port) = port {
        // SAFETY: single-threaded startup path, before any worker tasks spawn.
        unsafe {
            std::env::set_var("MCP_FUSION_LISTEN", format!("0.0.0.0:{port}"));
        }
    }

    match command {
        Some(command) => run_admin(debug, command.into()).await,
        None => run_server(config, debug, no_auth).await,
    }
}

async fn run_admin(debug: bool, action: cli::AdminAction) -> Result<()> {
    let storage = StorageConfig::resolve();
    let store: Arc<dyn mcpfusion_interfaces::Store> =
        Arc::new(SqliteStore::open(&storage.db_path).await.context("opening persistent store")?);

    let _guard = logging::init(&mcpfusion_config::LoggingConfig::default(), debug)?;
    admin::run(store, action).await
}

async fn run_server(config: Option<String>, debug: bool, no_auth: bool) -> Result<()> {
    // Logging must come up before bootstrap so its own startup logs (config
    // watcher, idle sweeper, ...) land somewhere; that means loading the
    // config graph once here for its `logging` section, then letting
    // `bootstrap` load it again for the long-lived `ConfigHandle`.
    let preload = ConfigLoader::resolve(config.as_deref())
        .and_then(|loader| loader.load())
        .context("loading configuration")?;
    let _guard = logging::init(&preload.logging, debug)?;

    let authorizer: Option<Arc<dyn mcpfusion_interfaces::Authorizer>> = if no_auth {
        tracing::warn!("starting with --no-auth: all tool calls are allowed under the NOAUTH tenant");
        Some(Arc::new(mcpfusion_interfaces::AllowAllAuthorizer))
    } else {
        None
    };

    let gateway = bootstrap(BootstrapOptions { config_flag: config, authorizer }).await?;
    tracing::info!(tools = gateway.catalog().len(), "mcpfusion gateway ready");

    shutdown_signal().await;
    tracing::info!("shutdown signal received, stopping background tasks");
    gateway.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
