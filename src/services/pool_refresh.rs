//! Periodic pool refresh service
//!
//! The pool never watches the registry on its own; this task pulls a fresh
//! snapshot on a fixed interval so health-check results become selectable.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info, instrument};

use crate::proxy::ProxyPool;

/// Pool refresh service configuration
#[derive(Clone)]
pub struct PoolRefreshConfig {
    /// Time between refreshes
    pub interval: Duration,
}

impl Default for PoolRefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

/// Pool refresh service
pub struct PoolRefreshService {
    pool: Arc<ProxyPool>,
    config: PoolRefreshConfig,
}

impl PoolRefreshService {
    pub fn new(pool: Arc<ProxyPool>, config: PoolRefreshConfig) -> Self {
        Self { pool, config }
    }

    /// Run until the shutdown signal flips to true
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting pool refresh service ({}s interval)",
            self.config.interval.as_secs()
        );

        // First tick fires immediately, giving the pool its initial snapshot
        let mut refresh_interval = interval(self.config.interval);

        loop {
            tokio::select! {
                _ = refresh_interval.tick() => {
                    self.pool.refresh();
                    debug!(nodes = self.pool.available_count(), "Scheduled pool refresh");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Pool refresh service shutting down");
                        break;
                    }
                }
            }
        }
    }
}

/// Handle for stopping the pool refresh service
pub struct PoolRefreshHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl PoolRefreshHandle {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { shutdown_tx: tx }, rx)
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Default for PoolRefreshHandle {
    fn default() -> Self {
        Self::new().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Node;
    use crate::proxy::PoolConfig;
    use crate::repository::NodeRegistry;

    #[test]
    fn test_config_default() {
        let config = PoolRefreshConfig::default();
        assert_eq!(config.interval, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_service_refreshes_until_shutdown() {
        let registry = Arc::new(NodeRegistry::in_memory());
        registry.upsert_node_state(Node::new("a", "ss://a"));

        let pool = Arc::new(ProxyPool::new(registry.clone(), PoolConfig::default()));
        assert!(!pool.has_snapshot());

        let service = PoolRefreshService::new(
            pool.clone(),
            PoolRefreshConfig {
                interval: Duration::from_millis(20),
            },
        );
        let (handle, shutdown) = PoolRefreshHandle::new();
        let task = tokio::spawn(async move { service.run(shutdown).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(pool.has_snapshot());
        assert_eq!(pool.available_count(), 1);

        registry.upsert_node_state(Node::new("b", "ss://b"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(pool.available_count(), 2);

        handle.shutdown();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("service did not stop")
            .unwrap();
    }
}
