//! Sequential (round-robin) node selection strategy

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{NodeSelector, WeightTable};
use crate::error::{Result, RotaError};
use crate::models::Node;

/// Selects nodes in round-robin order
///
/// The cursor is a lock-free counter that is never reset; it is taken
/// modulo the length of whatever candidate list the call receives, so a
/// change in list composition may skip or repeat an entry.
pub struct SequentialSelector {
    cursor: AtomicU64,
}

impl SequentialSelector {
    pub fn new() -> Self {
        Self {
            cursor: AtomicU64::new(0),
        }
    }
}

impl Default for SequentialSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeSelector for SequentialSelector {
    fn select(&self, candidates: &[Arc<Node>], _weights: &WeightTable) -> Result<Arc<Node>> {
        if candidates.is_empty() {
            return Err(RotaError::NoAvailableProxy);
        }

        let len = candidates.len() as u64;
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % len;

        candidates
            .get(idx as usize)
            .cloned()
            .ok_or(RotaError::NoAvailableProxy)
    }

    fn strategy_name(&self) -> &'static str {
        "sequential"
    }
}
