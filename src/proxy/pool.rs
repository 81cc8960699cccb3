//! Selection engine over a snapshot of the registry

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, instrument};

use super::rotation::{create_selector, NodeSelector, PoolMode, WeightTable};
use crate::error::{Result, RotaError};
use crate::models::{LatencyTier, Node, PoolStats, SelectionFilter};
use crate::repository::{NodeRegistry, UNKNOWN_REGION};

/// Bucket for nodes that were not added through a subscription
pub const MANUAL_SUBSCRIPTION: &str = "manual";

/// Proxy pool settings
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub mode: PoolMode,
    /// Relax the latency filter when nothing matches
    pub fallback_enabled: bool,
    /// Key callers must present; `None` disables the check
    pub access_key: Option<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            mode: PoolMode::Sequential,
            fallback_enabled: true,
            access_key: None,
        }
    }
}

struct PoolState {
    mode: PoolMode,
    selector: Arc<dyn NodeSelector>,
    nodes: Vec<Arc<Node>>,
    weights: WeightTable,
    refreshed: bool,
    fallback_enabled: bool,
    access_key: Option<String>,
}

impl PoolState {
    fn filtered(&self, filter: &SelectionFilter) -> Vec<Arc<Node>> {
        if filter.is_empty() {
            return self.nodes.clone();
        }
        self.nodes
            .iter()
            .filter(|node| filter.matches(node))
            .cloned()
            .collect()
    }

    /// Retry with progressively looser latency constraints
    ///
    /// low -> medium -> high -> any, medium -> high, anything else -> any.
    /// Region and subscription constraints are kept.
    fn fallback(&self, filter: &SelectionFilter) -> Vec<Arc<Node>> {
        let cascade: &[Option<LatencyTier>] = match filter.latency {
            Some(LatencyTier::Low) => &[
                Some(LatencyTier::Medium),
                Some(LatencyTier::High),
                None,
            ],
            Some(LatencyTier::Medium) => &[Some(LatencyTier::High)],
            _ => &[None],
        };

        for tier in cascade {
            let nodes = self.filtered(&filter.relaxed_to(*tier));
            if !nodes.is_empty() {
                debug!(
                    requested = ?filter.latency,
                    relaxed = ?tier,
                    "Latency filter relaxed"
                );
                return nodes;
            }
        }
        Vec::new()
    }
}

/// Picks nodes from a point-in-time snapshot of the registry
///
/// The snapshot only changes on [`ProxyPool::refresh`]. The pool lock is
/// never held while calling into the registry.
pub struct ProxyPool {
    registry: Arc<NodeRegistry>,
    state: RwLock<PoolState>,
}

impl ProxyPool {
    pub fn new(registry: Arc<NodeRegistry>, config: PoolConfig) -> Self {
        Self {
            registry,
            state: RwLock::new(PoolState {
                mode: config.mode,
                selector: Arc::from(create_selector(config.mode)),
                nodes: Vec::new(),
                weights: WeightTable::default(),
                refreshed: false,
                fallback_enabled: config.fallback_enabled,
                access_key: config.access_key.filter(|key| !key.is_empty()),
            }),
        }
    }

    pub fn mode(&self) -> PoolMode {
        self.state.read().mode
    }

    /// Switch strategy; the sequential cursor starts over
    pub fn set_mode(&self, mode: PoolMode) {
        let mut state = self.state.write();
        if state.mode != mode {
            info!(from = %state.mode, to = %mode, "Pool mode changed");
            state.mode = mode;
            state.selector = Arc::from(create_selector(mode));
        }
    }

    pub fn fallback_enabled(&self) -> bool {
        self.state.read().fallback_enabled
    }

    pub fn set_fallback_enabled(&self, enabled: bool) {
        self.state.write().fallback_enabled = enabled;
    }

    /// Replace the access key; `None` or an empty key disables the check
    pub fn set_access_key(&self, key: Option<String>) {
        self.state.write().access_key = key.filter(|key| !key.is_empty());
    }

    /// Pull the selectable nodes from the registry and rebuild the weights
    #[instrument(skip(self))]
    pub fn refresh(&self) {
        let nodes: Vec<Arc<Node>> = self
            .registry
            .list_available_nodes()
            .into_iter()
            .map(Arc::new)
            .collect();
        let weights = WeightTable::from_nodes(&nodes);
        let count = nodes.len();

        {
            let mut state = self.state.write();
            state.nodes = nodes;
            state.weights = weights;
            state.refreshed = true;
        }

        debug!(nodes = count, "Pool refreshed");
    }

    /// Whether a snapshot has been taken since construction
    pub fn has_snapshot(&self) -> bool {
        self.state.read().refreshed
    }

    /// Number of nodes in the current snapshot
    pub fn available_count(&self) -> usize {
        self.state.read().nodes.len()
    }

    /// Pick one node matching `filter` using the active mode
    pub fn select_one(&self, filter: &SelectionFilter) -> Result<Arc<Node>> {
        let state = self.state.read();

        let mut candidates = state.filtered(filter);
        if candidates.is_empty() && state.fallback_enabled && filter.latency.is_some() {
            candidates = state.fallback(filter);
        }
        if candidates.is_empty() {
            debug!(?filter, "No node matches filter");
            return Err(RotaError::NoAvailableProxy);
        }

        let node = state.selector.select(&candidates, &state.weights)?;
        debug!(node = %node.key(), mode = %state.mode, "Node selected");
        Ok(node)
    }

    /// [`ProxyPool::select_one`] behind the access-key check
    pub fn select_one_authorized(&self, key: &str, filter: &SelectionFilter) -> Result<Arc<Node>> {
        if !self.validate_key(key) {
            return Err(RotaError::Unauthorized);
        }
        self.select_one(filter)
    }

    /// Up to `limit` matching nodes in snapshot order, 0 meaning all
    pub fn select_many(&self, filter: &SelectionFilter, limit: usize) -> Vec<Arc<Node>> {
        let mut nodes = self.state.read().filtered(filter);
        if limit > 0 {
            nodes.truncate(limit);
        }
        nodes
    }

    /// Accept any key when none is configured
    pub fn validate_key(&self, key: &str) -> bool {
        match &self.state.read().access_key {
            Some(expected) => key == expected.as_str(),
            None => true,
        }
    }

    /// Refresh, then break the snapshot down by tier, region and subscription
    pub fn stats(&self) -> PoolStats {
        self.refresh();

        let state = self.state.read();
        let mut by_latency: HashMap<String, usize> = HashMap::new();
        let mut by_region: HashMap<String, usize> = HashMap::new();
        let mut by_subscription: HashMap<String, usize> = HashMap::new();

        for node in &state.nodes {
            *by_latency
                .entry(node.latency_level.as_str().to_string())
                .or_default() += 1;

            let region = node
                .region
                .as_deref()
                .filter(|r| !r.is_empty())
                .unwrap_or(UNKNOWN_REGION);
            *by_region.entry(region.to_string()).or_default() += 1;

            let subscription = node
                .subscription_name
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or(MANUAL_SUBSCRIPTION);
            *by_subscription.entry(subscription.to_string()).or_default() += 1;
        }

        PoolStats {
            total_nodes: state.nodes.len(),
            mode: state.mode.as_str().to_string(),
            by_latency,
            by_region,
            by_subscription,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NodeStatus, ProbeResult};

    fn registry_with(nodes: &[(&str, i64)]) -> Arc<NodeRegistry> {
        let registry = Arc::new(NodeRegistry::in_memory());
        for (name, latency) in nodes {
            let mut node = Node::new(*name, format!("ss://{name}"));
            node.latency = *latency;
            registry.upsert_node_state(node);
        }
        registry
    }

    fn refreshed_pool(registry: &Arc<NodeRegistry>, mode: PoolMode) -> ProxyPool {
        let pool = ProxyPool::new(
            registry.clone(),
            PoolConfig {
                mode,
                ..PoolConfig::default()
            },
        );
        pool.refresh();
        pool
    }

    #[test]
    fn test_fresh_pool_has_no_snapshot() {
        let registry = registry_with(&[("a", 10)]);
        let pool = ProxyPool::new(registry, PoolConfig::default());

        assert!(!pool.has_snapshot());
        assert!(matches!(
            pool.select_one(&SelectionFilter::new()),
            Err(RotaError::NoAvailableProxy)
        ));

        pool.refresh();
        assert!(pool.has_snapshot());
        assert_eq!(pool.available_count(), 1);
    }

    #[test]
    fn test_snapshot_is_stale_until_refresh() {
        let registry = registry_with(&[("a", 10), ("b", 20)]);
        let pool = refreshed_pool(&registry, PoolMode::Sequential);

        registry.set_node_status("a", NodeStatus::Disabled).unwrap();
        assert_eq!(pool.available_count(), 2);

        pool.refresh();
        assert_eq!(pool.available_count(), 1);
        assert_eq!(pool.select_one(&SelectionFilter::new()).unwrap().name, "b");
    }

    #[test]
    fn test_sequential_rotation_visits_each_twice() {
        let registry = registry_with(&[("a", 10), ("b", 20), ("c", 30)]);
        let pool = refreshed_pool(&registry, PoolMode::Sequential);

        let picked: Vec<String> = (0..6)
            .map(|_| pool.select_one(&SelectionFilter::new()).unwrap().name.clone())
            .collect();
        assert_eq!(picked, vec!["a", "b", "c", "a", "b", "c"]);
    }

    #[test]
    fn test_fallback_low_to_medium() {
        let registry = registry_with(&[("B", 150), ("C", 400)]);
        let pool = refreshed_pool(&registry, PoolMode::Random);

        let filter = SelectionFilter::new().with_latency(LatencyTier::Low);
        for _ in 0..20 {
            assert_eq!(pool.select_one(&filter).unwrap().name, "B");
        }
    }

    #[test]
    fn test_fallback_low_reaches_high_then_unfiltered() {
        let registry = registry_with(&[("C", 400)]);
        let pool = refreshed_pool(&registry, PoolMode::Sequential);
        let low = SelectionFilter::new().with_latency(LatencyTier::Low);
        assert_eq!(pool.select_one(&low).unwrap().name, "C");

        let registry = registry_with(&[("U", -1)]);
        let pool = refreshed_pool(&registry, PoolMode::Sequential);
        assert_eq!(pool.select_one(&low).unwrap().name, "U");
    }

    #[test]
    fn test_fallback_medium_only_relaxes_to_high() {
        let registry = registry_with(&[("A", 20)]);
        let pool = refreshed_pool(&registry, PoolMode::Sequential);

        let medium = SelectionFilter::new().with_latency(LatencyTier::Medium);
        assert!(matches!(
            pool.select_one(&medium),
            Err(RotaError::NoAvailableProxy)
        ));

        let high = SelectionFilter::new().with_latency(LatencyTier::High);
        assert_eq!(pool.select_one(&high).unwrap().name, "A");
    }

    #[test]
    fn test_fallback_never_relaxes_region() {
        let registry = registry_with(&[("B", 150)]);
        let pool = refreshed_pool(&registry, PoolMode::Sequential);

        let filter = SelectionFilter::new()
            .with_latency(LatencyTier::Low)
            .with_region("JP");
        assert!(matches!(
            pool.select_one(&filter),
            Err(RotaError::NoAvailableProxy)
        ));
    }

    #[test]
    fn test_fallback_disabled() {
        let registry = registry_with(&[("B", 150)]);
        let pool = ProxyPool::new(
            registry,
            PoolConfig {
                fallback_enabled: false,
                ..PoolConfig::default()
            },
        );
        pool.refresh();
        assert!(!pool.fallback_enabled());

        let filter = SelectionFilter::new().with_latency(LatencyTier::Low);
        assert!(matches!(
            pool.select_one(&filter),
            Err(RotaError::NoAvailableProxy)
        ));

        pool.set_fallback_enabled(true);
        assert_eq!(pool.select_one(&filter).unwrap().name, "B");
    }

    #[test]
    fn test_weighted_mode_prefers_fast_nodes() {
        let registry = registry_with(&[("A", 50), ("B", 500)]);
        let pool = refreshed_pool(&registry, PoolMode::Weighted);

        let hits_a = (0..10_000)
            .filter(|_| pool.select_one(&SelectionFilter::new()).unwrap().name == "A")
            .count();
        let share = hits_a as f64 / 10_000.0;
        assert!((0.93..=0.97).contains(&share), "share = {share}");
    }

    #[test]
    fn test_select_many_limit_and_order() {
        let registry = registry_with(&[("a", 10), ("b", 150), ("c", 20)]);
        let pool = refreshed_pool(&registry, PoolMode::Random);

        let all = pool.select_many(&SelectionFilter::new(), 0);
        let names: Vec<_> = all.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        assert_eq!(pool.select_many(&SelectionFilter::new(), 2).len(), 2);

        let low = SelectionFilter::new().with_latency(LatencyTier::Low);
        let names: Vec<_> = pool
            .select_many(&low, 0)
            .iter()
            .map(|n| n.name.clone())
            .collect();
        assert_eq!(names, vec!["a", "c"]);

        // No fallback for listings
        let high = SelectionFilter::new().with_latency(LatencyTier::High);
        assert!(pool.select_many(&high, 0).is_empty());
    }

    #[test]
    fn test_subscription_filter_matches_id_or_name() {
        let registry = Arc::new(NodeRegistry::in_memory());
        let mut node = Node::new("a", "ss://a");
        node.subscription_id = Some("sub-1".to_string());
        node.subscription_name = Some("provider".to_string());
        registry.upsert_node_state(node);
        registry.upsert_node_state(Node::new("b", "ss://b"));
        let pool = refreshed_pool(&registry, PoolMode::Sequential);

        for key in ["sub-1", "provider"] {
            let filter = SelectionFilter::new().with_subscription(key);
            assert_eq!(pool.select_many(&filter, 0).len(), 1);
            assert_eq!(pool.select_one(&filter).unwrap().name, "a");
        }
    }

    #[test]
    fn test_validate_key() {
        let registry = registry_with(&[("a", 10)]);
        let open = ProxyPool::new(registry.clone(), PoolConfig::default());
        assert!(open.validate_key(""));
        assert!(open.validate_key("anything"));

        let locked = ProxyPool::new(
            registry,
            PoolConfig {
                access_key: Some("secret".to_string()),
                ..PoolConfig::default()
            },
        );
        locked.refresh();
        assert!(locked.validate_key("secret"));
        assert!(!locked.validate_key("wrong"));
        assert!(matches!(
            locked.select_one_authorized("wrong", &SelectionFilter::new()),
            Err(RotaError::Unauthorized)
        ));
        assert!(locked
            .select_one_authorized("secret", &SelectionFilter::new())
            .is_ok());

        locked.set_access_key(Some(String::new()));
        assert!(locked.validate_key("wrong"));
    }

    #[test]
    fn test_set_mode() {
        let registry = registry_with(&[("a", 10)]);
        let pool = refreshed_pool(&registry, PoolMode::Sequential);
        pool.set_mode(PoolMode::LatencyFirst);
        assert_eq!(pool.mode(), PoolMode::LatencyFirst);
        assert_eq!(pool.select_one(&SelectionFilter::new()).unwrap().name, "a");
    }

    #[test]
    fn test_stats_refreshes_and_buckets() {
        let registry = Arc::new(NodeRegistry::in_memory());
        let pool = ProxyPool::new(registry.clone(), PoolConfig::default());

        let mut jp = Node::new("jp", "ss://jp");
        jp.latency = 40;
        jp.region = Some("JP".to_string());
        jp.subscription_name = Some("provider".to_string());
        registry.upsert_node_state(jp);
        registry.upsert_node_state(Node::new("plain", "ss://plain"));
        let mut down = Node::new("down", "ss://down");
        down.available = false;
        registry.upsert_node_state(down);

        let stats = pool.stats();
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.mode, "sequential");
        assert_eq!(stats.by_latency["low"], 1);
        assert_eq!(stats.by_latency["unknown"], 1);
        assert_eq!(stats.by_region["JP"], 1);
        assert_eq!(stats.by_region["unknown"], 1);
        assert_eq!(stats.by_subscription["provider"], 1);
        assert_eq!(stats.by_subscription["manual"], 1);

        registry
            .apply_probe_result(
                "plain",
                ProbeResult {
                    latency_ms: 10,
                    available: false,
                    failure_count: 1,
                    success_count: 0,
                },
            )
            .unwrap();
        assert_eq!(pool.stats().total_nodes, 1);
    }
}
