//! Rota Nodes - Entry Point
//!
//! Loads the registry, keeps the selection pool refreshed and saves the
//! registry on graceful shutdown.

use std::sync::Arc;

use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rota_nodes::services::{PoolRefreshHandle, PoolRefreshService};
use rota_nodes::{Config, NodeRegistry, ProxyPool, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration before tracing so LOG_LEVEL/LOG_FORMAT apply
    let config = Config::from_env()?;
    init_tracing(&config);

    info!("Starting Rota node registry");

    let registry = match &config.registry.data_dir {
        Some(dir) => NodeRegistry::open(dir)?,
        None => {
            warn!("ROTA_DATA_DIR is empty, registry will not be persisted");
            NodeRegistry::in_memory()
        }
    };
    let registry = Arc::new(registry);
    if let Some(latency) = config.registry.latency {
        registry.set_latency_config(latency)?;
    }
    info!(
        subscriptions = registry.list_subscriptions().len(),
        nodes = registry.list_nodes().len(),
        "Registry loaded"
    );

    let pool = Arc::new(ProxyPool::new(registry.clone(), config.pool_config()));
    pool.refresh();
    info!(
        mode = %pool.mode(),
        available = pool.available_count(),
        "Selection pool ready"
    );

    let (refresh_handle, refresh_shutdown) = PoolRefreshHandle::new();
    let refresh_service = PoolRefreshService::new(pool.clone(), config.refresh_config());
    let refresh_task = tokio::spawn(async move {
        refresh_service.run(refresh_shutdown).await;
    });

    shutdown_signal().await;
    info!("Shutdown signal received");

    refresh_handle.shutdown();
    let _ = refresh_task.await;

    if let Err(e) = registry.save() {
        error!("Failed to save registry on shutdown: {}", e);
    }

    info!("Rota node registry stopped");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("rota_nodes={}", config.log.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.log.format.eq_ignore_ascii_case("pretty") {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
