//! Random node selection strategy

use rand::seq::SliceRandom;
use std::sync::Arc;

use super::{NodeSelector, WeightTable};
use crate::error::{Result, RotaError};
use crate::models::Node;

/// Selects a uniformly random node from the candidates
pub struct RandomSelector;

impl RandomSelector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeSelector for RandomSelector {
    fn select(&self, candidates: &[Arc<Node>], _weights: &WeightTable) -> Result<Arc<Node>> {
        let mut rng = rand::thread_rng();
        candidates
            .choose(&mut rng)
            .cloned()
            .ok_or(RotaError::NoAvailableProxy)
    }

    fn strategy_name(&self) -> &'static str {
        "random"
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_node;
    use super::*;

    #[test]
    fn test_random_selector_empty() {
        let selector = RandomSelector::new();
        let result = selector.select(&[], &WeightTable::default());
        assert!(matches!(result, Err(RotaError::NoAvailableProxy)));
    }

    #[test]
    fn test_random_selector_single_node() {
        let selector = RandomSelector::new();
        let nodes = vec![test_node("only", 10)];

        let selected = selector.select(&nodes, &WeightTable::default()).unwrap();
        assert_eq!(selected.name, "only");
    }

    #[test]
    fn test_random_selector_reaches_every_node() {
        let selector = RandomSelector::new();
        let nodes = vec![test_node("a", 10), test_node("b", 20), test_node("c", 30)];
        let weights = WeightTable::default();

        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(selector.select(&nodes, &weights).unwrap().name.clone());
        }
        assert_eq!(seen.len(), 3);
    }
}
