use std::collections::HashMap;
use std::path::Path;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use parking_lot::RwLock;
use rand::RngCore;
use tracing::{debug, info, instrument, warn};

use crate::classify::{classify, detect};
use crate::error::{Result, RotaError};
use crate::models::{
    LatencyConfig, LatencyTier, Node, NodeDescriptor, NodeStatus, ProbeResult, Subscription,
    DEFAULT_REFRESH_INTERVAL,
};
use crate::storage::{DocumentStore, StoreDocumentRef};

/// Group name for nodes without a detected region
pub const UNKNOWN_REGION: &str = "unknown";

#[derive(Debug, Default)]
struct RegistryState {
    subscriptions: HashMap<String, Subscription>,
    node_states: HashMap<String, Node>,
    latency_config: LatencyConfig,
}

impl RegistryState {
    fn document(&self) -> StoreDocumentRef<'_> {
        StoreDocumentRef {
            subscriptions: &self.subscriptions,
            node_states: &self.node_states,
            latency_config: &self.latency_config,
        }
    }

    fn retier_all(&mut self) {
        let cfg = self.latency_config;
        for node in self.node_states.values_mut() {
            node.latency_level = classify(node.latency, &cfg);
        }
    }

    /// Nodes passing `keep`, sorted by key
    fn collect_nodes(&self, keep: impl Fn(&Node) -> bool) -> Vec<Node> {
        let mut nodes: Vec<Node> = self
            .node_states
            .values()
            .filter(|node| keep(*node))
            .cloned()
            .collect();
        nodes.sort_by(|a, b| a.key().cmp(b.key()));
        nodes
    }
}

/// Source of truth for subscriptions and per-node state
///
/// All access goes through one reader/writer lock. Mutations that persist
/// write the whole document before the lock is released; a failed write
/// leaves the in-memory mutation in place and is reported to the caller.
/// Node telemetry updates (`upsert_node_state`, `register_node`,
/// `apply_probe_result`) stay in memory until the next persisting call or
/// an explicit [`NodeRegistry::save`].
#[derive(Debug)]
pub struct NodeRegistry {
    state: RwLock<RegistryState>,
    storage: DocumentStore,
}

impl NodeRegistry {
    /// Registry persisted under `data_dir`, loading any existing document
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let registry = Self::with_storage(DocumentStore::open(data_dir)?);
        registry.load()?;
        Ok(registry)
    }

    /// Registry without persistence
    pub fn in_memory() -> Self {
        Self::with_storage(DocumentStore::in_memory())
    }

    fn with_storage(storage: DocumentStore) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            storage,
        }
    }

    fn persist(&self, state: &RegistryState) -> Result<()> {
        self.storage.save(&state.document()).inspect_err(|e| {
            warn!("Failed to persist registry: {}", e);
        })
    }

    // --- Latency configuration ---

    pub fn latency_config(&self) -> LatencyConfig {
        self.state.read().latency_config
    }

    /// Replace the thresholds and re-derive every stored tier
    #[instrument(skip(self))]
    pub fn set_latency_config(&self, cfg: LatencyConfig) -> Result<()> {
        if !cfg.is_monotonic() {
            warn!(
                low = cfg.low_threshold,
                medium = cfg.medium_threshold,
                "Low latency threshold exceeds medium threshold"
            );
        }

        let mut state = self.state.write();
        state.latency_config = cfg;
        state.retier_all();
        self.persist(&state)
    }

    /// Classify a latency against the current thresholds
    pub fn classify_latency(&self, latency_ms: i64) -> LatencyTier {
        classify(latency_ms, &self.state.read().latency_config)
    }

    // --- Subscriptions ---

    /// Insert a subscription, generating its id when absent
    #[instrument(skip(self, sub), fields(url = %sub.url))]
    pub fn add_subscription(&self, mut sub: Subscription) -> Result<Subscription> {
        if sub.id.is_empty() {
            sub.id = generate_id();
        }
        let now = Utc::now();
        sub.created_at = now;
        sub.updated_at = now;
        if sub.refresh_interval.is_empty() {
            sub.refresh_interval = DEFAULT_REFRESH_INTERVAL.to_string();
        }

        let mut state = self.state.write();
        state.subscriptions.insert(sub.id.clone(), sub.clone());
        info!(id = %sub.id, name = %sub.name, "Subscription added");
        self.persist(&state)?;
        Ok(sub)
    }

    /// Replace an existing subscription record
    #[instrument(skip(self, sub), fields(id = %sub.id))]
    pub fn update_subscription(&self, mut sub: Subscription) -> Result<Subscription> {
        let mut state = self.state.write();
        let Some(existing) = state.subscriptions.get(&sub.id) else {
            return Err(RotaError::subscription_not_found(&sub.id));
        };

        sub.created_at = existing.created_at;
        sub.updated_at = Utc::now();
        state.subscriptions.insert(sub.id.clone(), sub.clone());
        self.persist(&state)?;
        Ok(sub)
    }

    /// Remove a subscription; its nodes are left in place
    #[instrument(skip(self))]
    pub fn delete_subscription(&self, id: &str) -> Result<Subscription> {
        let mut state = self.state.write();
        let removed = state
            .subscriptions
            .remove(id)
            .ok_or_else(|| RotaError::subscription_not_found(id))?;

        info!(id, name = %removed.name, "Subscription deleted");
        self.persist(&state)?;
        Ok(removed)
    }

    pub fn get_subscription(&self, id: &str) -> Result<Subscription> {
        self.state
            .read()
            .subscriptions
            .get(id)
            .cloned()
            .ok_or_else(|| RotaError::subscription_not_found(id))
    }

    pub fn list_subscriptions(&self) -> Vec<Subscription> {
        self.state.read().subscriptions.values().cloned().collect()
    }

    /// Flip the enabled flag, returning the new value
    #[instrument(skip(self))]
    pub fn toggle_subscription(&self, id: &str) -> Result<bool> {
        let mut state = self.state.write();
        let sub = state
            .subscriptions
            .get_mut(id)
            .ok_or_else(|| RotaError::subscription_not_found(id))?;

        sub.enabled = !sub.enabled;
        sub.updated_at = Utc::now();
        let enabled = sub.enabled;
        self.persist(&state)?;
        Ok(enabled)
    }

    /// Record the outcome of a feed refresh
    #[instrument(skip(self, error))]
    pub fn record_subscription_refresh(
        &self,
        id: &str,
        node_count: usize,
        error: Option<String>,
    ) -> Result<()> {
        let mut state = self.state.write();
        let sub = state
            .subscriptions
            .get_mut(id)
            .ok_or_else(|| RotaError::subscription_not_found(id))?;

        let now = Utc::now();
        sub.last_refresh_at = Some(now);
        sub.updated_at = now;
        sub.node_count = node_count;
        if let Some(err) = &error {
            warn!(id, "Subscription refresh failed: {}", err);
        }
        sub.last_error = error;
        self.persist(&state)
    }

    // --- Node state ---

    /// Insert or replace a node keyed by name-or-URI
    ///
    /// The tier is recomputed from the latency; whatever the caller put in
    /// `latency_level` is ignored.
    pub fn upsert_node_state(&self, mut node: Node) {
        let mut state = self.state.write();
        node.latency_level = classify(node.latency, &state.latency_config);
        let key = node.key().to_string();
        debug!(key = %key, latency = node.latency, "Node state updated");
        state.node_states.insert(key, node);
    }

    /// Seed or refresh a node from a raw descriptor
    ///
    /// A new node starts enabled and available with unknown latency. An
    /// existing node keeps its status and health counters.
    pub fn register_node(&self, descriptor: NodeDescriptor) -> Node {
        let mut region = detect(&descriptor.name);
        if region.is_empty() {
            region = detect(&descriptor.uri);
        }

        let mut state = self.state.write();
        let cfg = state.latency_config;
        let key = descriptor.key().to_string();
        let node = state
            .node_states
            .entry(key)
            .or_insert_with(|| Node::new(descriptor.name.clone(), descriptor.uri.clone()));

        node.name = descriptor.name;
        node.uri = descriptor.uri;
        node.port = descriptor.port;
        node.subscription_id = descriptor.subscription_id;
        node.subscription_name = descriptor.subscription_name;
        node.region = (!region.is_empty()).then(|| region.code.to_string());
        node.region_name = (!region.is_empty()).then(|| region.name.to_string());
        node.latency_level = classify(node.latency, &cfg);

        node.clone()
    }

    /// Apply a health-check result to an existing node
    pub fn apply_probe_result(&self, key: &str, result: ProbeResult) -> Result<Node> {
        let mut state = self.state.write();
        let cfg = state.latency_config;
        let node = state
            .node_states
            .get_mut(key)
            .ok_or_else(|| RotaError::node_not_found(key))?;

        node.latency = result.latency_ms;
        node.latency_level = classify(result.latency_ms, &cfg);
        node.available = result.available;
        node.failure_count = result.failure_count;
        node.success_count = result.success_count;
        node.last_check_at = Some(Utc::now());
        Ok(node.clone())
    }

    pub fn get_node_state(&self, key: &str) -> Option<Node> {
        self.state.read().node_states.get(key).cloned()
    }

    /// Change the administrative status of a node
    #[instrument(skip(self))]
    pub fn set_node_status(&self, key: &str, status: NodeStatus) -> Result<()> {
        let mut state = self.state.write();
        let node = state
            .node_states
            .get_mut(key)
            .ok_or_else(|| RotaError::node_not_found(key))?;

        node.status = status;
        info!(key, %status, "Node status changed");
        self.persist(&state)
    }

    /// Every node regardless of status, sorted by key
    pub fn list_nodes(&self) -> Vec<Node> {
        self.state.read().collect_nodes(|_| true)
    }

    pub fn list_nodes_by_latency_tier(&self, tier: LatencyTier) -> Vec<Node> {
        self.state
            .read()
            .collect_nodes(|node| node.latency_level == tier && node.is_selectable())
    }

    /// Selectable nodes in a region; the code is matched case-insensitively
    pub fn list_nodes_by_region(&self, code: &str) -> Vec<Node> {
        self.state.read().collect_nodes(|node| {
            node.region
                .as_deref()
                .is_some_and(|r| r.eq_ignore_ascii_case(code))
                && node.is_selectable()
        })
    }

    /// Enabled nodes of a subscription, available or not
    pub fn list_nodes_by_subscription(&self, subscription_id: &str) -> Vec<Node> {
        self.state.read().collect_nodes(|node| {
            node.subscription_id.as_deref() == Some(subscription_id)
                && node.status == NodeStatus::Enabled
        })
    }

    pub fn list_available_nodes(&self) -> Vec<Node> {
        self.state.read().collect_nodes(Node::is_selectable)
    }

    pub fn group_by_latency_tier(&self) -> HashMap<LatencyTier, Vec<Node>> {
        let mut groups: HashMap<LatencyTier, Vec<Node>> = HashMap::new();
        for node in self.list_available_nodes() {
            groups.entry(node.latency_level).or_default().push(node);
        }
        groups
    }

    /// Selectable nodes by region code, unset regions under [`UNKNOWN_REGION`]
    pub fn group_by_region(&self) -> HashMap<String, Vec<Node>> {
        let mut groups: HashMap<String, Vec<Node>> = HashMap::new();
        for node in self.list_available_nodes() {
            let region = node
                .region
                .clone()
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| UNKNOWN_REGION.to_string());
            groups.entry(region).or_default().push(node);
        }
        groups
    }

    /// Enabled nodes of every known subscription, keyed by subscription id
    pub fn group_by_subscription(&self) -> HashMap<String, Vec<Node>> {
        let state = self.state.read();
        state
            .subscriptions
            .keys()
            .map(|id| {
                let nodes = state.collect_nodes(|node| {
                    node.subscription_id.as_deref() == Some(id.as_str())
                        && node.status == NodeStatus::Enabled
                });
                (id.clone(), nodes)
            })
            .collect()
    }

    // --- Persistence ---

    /// Drop every node and subscription
    #[instrument(skip(self))]
    pub fn reset(&self) -> Result<()> {
        let mut state = self.state.write();
        state.subscriptions.clear();
        state.node_states.clear();
        info!("Registry reset");
        self.persist(&state)
    }

    /// Persist the whole registry
    pub fn save(&self) -> Result<()> {
        let state = self.state.write();
        self.persist(&state)
    }

    /// Replace in-memory state with the document on disk
    ///
    /// A missing document leaves the registry untouched.
    pub fn load(&self) -> Result<()> {
        let Some(document) = self.storage.load()? else {
            return Ok(());
        };

        let mut state = self.state.write();
        state.subscriptions = document.subscriptions;
        state.node_states = document.node_states;
        if let Some(cfg) = document.latency_config.filter(|cfg| cfg.low_threshold > 0) {
            state.latency_config = cfg;
        }
        state.retier_all();

        info!(
            subscriptions = state.subscriptions.len(),
            nodes = state.node_states.len(),
            "Registry loaded"
        );
        Ok(())
    }
}

/// Timestamp prefix plus 12 URL-safe characters of OS-seeded randomness
fn generate_id() -> String {
    let mut bytes = [0u8; 9];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!(
        "{}{}",
        Utc::now().format("%Y%m%d%H%M%S"),
        URL_SAFE_NO_PAD.encode(bytes)
    )
}
