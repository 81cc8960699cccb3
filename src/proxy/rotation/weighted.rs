//! Weighted lottery node selection strategy

use rand::Rng;
use std::sync::Arc;

use super::{NodeSelector, WeightTable};
use crate::error::{Result, RotaError};
use crate::models::Node;

/// Draws a node with probability proportional to its latency weight
pub struct WeightedSelector;

impl WeightedSelector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WeightedSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeSelector for WeightedSelector {
    fn select(&self, candidates: &[Arc<Node>], weights: &WeightTable) -> Result<Arc<Node>> {
        let first = candidates.first().ok_or(RotaError::NoAvailableProxy)?;

        let total: u64 = candidates
            .iter()
            .map(|node| u64::from(weights.weight(node)))
            .sum();
        if total == 0 {
            return Ok(first.clone());
        }

        let mut draw = rand::thread_rng().gen_range(0..total);
        for node in candidates {
            let weight = u64::from(weights.weight(node));
            if draw < weight {
                return Ok(node.clone());
            }
            draw -= weight;
        }

        Ok(first.clone())
    }

    fn strategy_name(&self) -> &'static str {
        "weighted"
    }
}
