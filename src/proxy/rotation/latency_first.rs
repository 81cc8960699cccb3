//! Latency-biased node selection strategy

use rand::Rng;
use std::sync::Arc;

use super::{NodeSelector, WeightTable};
use crate::error::{Result, RotaError};
use crate::models::Node;

/// How many of the fastest nodes share the load
const TOP_N: usize = 3;

/// Picks uniformly among the few lowest-latency candidates
///
/// Unmeasured nodes sort after every measured one.
pub struct LatencyFirstSelector;

impl LatencyFirstSelector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LatencyFirstSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeSelector for LatencyFirstSelector {
    fn select(&self, candidates: &[Arc<Node>], _weights: &WeightTable) -> Result<Arc<Node>> {
        if candidates.is_empty() {
            return Err(RotaError::NoAvailableProxy);
        }

        let mut sorted = candidates.to_vec();
        sorted.sort_by_key(|node| (node.latency < 0, node.latency));

        let top = sorted.len().min(TOP_N);
        let idx = rand::thread_rng().gen_range(0..top);
        Ok(sorted.swap_remove(idx))
    }

    fn strategy_name(&self) -> &'static str {
        "latency_first"
    }
}
