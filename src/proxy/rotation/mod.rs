//! Node selection strategies
//!
//! Each strategy picks one node out of an already-filtered candidate list.
//! Filtering and fallback live in [`crate::proxy::pool::ProxyPool`].

mod latency_first;
mod random;
mod sequential;
mod weighted;

pub use latency_first::LatencyFirstSelector;
pub use random::RandomSelector;
pub use sequential::SequentialSelector;
pub use weighted::WeightedSelector;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Node;

/// Pool-wide selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolMode {
    #[default]
    Sequential,
    Random,
    LatencyFirst,
    Weighted,
}

impl PoolMode {
    /// Parse a mode name; unrecognized names fall back to sequential
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "random" => Self::Random,
            "latency_first" | "latencyfirst" | "latency-first" | "latency" => Self::LatencyFirst,
            "weighted" | "weight" => Self::Weighted,
            _ => Self::Sequential,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Random => "random",
            Self::LatencyFirst => "latency_first",
            Self::Weighted => "weighted",
        }
    }
}

impl std::fmt::Display for PoolMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Latency-derived lottery weights, keyed by node key
#[derive(Debug, Clone, Default)]
pub struct WeightTable {
    weights: HashMap<String, u32>,
    total: u64,
}

impl WeightTable {
    /// Step function of latency; never increases as latency grows
    pub fn weight_for_latency(latency_ms: i64) -> u32 {
        match latency_ms {
            ms if ms < 0 => 1,
            0..=50 => 100,
            51..=100 => 80,
            101..=200 => 50,
            201..=300 => 30,
            301..=500 => 15,
            _ => 5,
        }
    }

    pub fn from_nodes(nodes: &[Arc<Node>]) -> Self {
        let mut table = Self::default();
        for node in nodes {
            let weight = Self::weight_for_latency(node.latency);
            table.weights.insert(node.key().to_string(), weight);
            table.total += u64::from(weight);
        }
        table
    }

    /// Weight of a node, 1 when it is not in the table
    pub fn weight(&self, node: &Node) -> u32 {
        self.weights.get(node.key()).copied().unwrap_or(1)
    }

    /// Sum of the weights of the snapshot the table was built from
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Trait for node selection strategies
pub trait NodeSelector: Send + Sync {
    /// Pick one node out of `candidates`
    ///
    /// Returns an error if `candidates` is empty
    fn select(&self, candidates: &[Arc<Node>], weights: &WeightTable) -> Result<Arc<Node>>;

    /// Get the strategy name
    fn strategy_name(&self) -> &'static str;
}

/// Create a node selector for the given mode
pub fn create_selector(mode: PoolMode) -> Box<dyn NodeSelector> {
    match mode {
        PoolMode::Sequential => Box::new(SequentialSelector::new()),
        PoolMode::Random => Box::new(RandomSelector::new()),
        PoolMode::LatencyFirst => Box::new(LatencyFirstSelector::new()),
        PoolMode::Weighted => Box::new(WeightedSelector::new()),
    }
}

#[cfg(test)]
pub(crate) fn test_node(name: &str, latency: i64) -> Arc<Node> {
    let mut node = Node::new(name, format!("ss://{name}"));
    node.latency = latency;
    Arc::new(node)
}
