use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{LatencyTier, Node};
use crate::error::{Result, RotaError};

/// Per-request constraints applied to the pool snapshot
///
/// All fields are optional and AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SelectionFilter {
    pub latency: Option<LatencyTier>,
    /// Region code, stored upper-case
    pub region: Option<String>,
    /// Subscription id or display name
    pub subscription: Option<String>,
}

impl SelectionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, tier: LatencyTier) -> Self {
        self.latency = Some(tier);
        self
    }

    pub fn with_region(mut self, region: &str) -> Self {
        let region = region.trim();
        self.region = if region.is_empty() {
            None
        } else {
            Some(region.to_uppercase())
        };
        self
    }

    pub fn with_subscription(mut self, subscription: &str) -> Self {
        let subscription = subscription.trim();
        self.subscription = if subscription.is_empty() {
            None
        } else {
            Some(subscription.to_string())
        };
        self
    }

    pub fn is_empty(&self) -> bool {
        self.latency.is_none() && self.region.is_none() && self.subscription.is_none()
    }

    /// Check a node against every constraint that is set
    pub fn matches(&self, node: &Node) -> bool {
        if let Some(tier) = self.latency {
            if node.latency_level != tier {
                return false;
            }
        }

        if let Some(region) = &self.region {
            if !node
                .region
                .as_deref()
                .is_some_and(|r| r.eq_ignore_ascii_case(region))
            {
                return false;
            }
        }

        if let Some(subscription) = &self.subscription {
            if !node.belongs_to(subscription) {
                return false;
            }
        }

        true
    }

    /// Build a filter from raw request parameters
    ///
    /// Blank values are treated as absent. Only low, medium and high are
    /// accepted as a latency tier.
    pub fn from_params(
        latency: Option<&str>,
        region: Option<&str>,
        subscription: Option<&str>,
    ) -> Result<Self> {
        let mut filter = Self::new()
            .with_region(region.unwrap_or_default())
            .with_subscription(subscription.unwrap_or_default());

        if let Some(raw) = latency.map(str::trim).filter(|s| !s.is_empty()) {
            match LatencyTier::from_str(raw) {
                Some(tier) if tier != LatencyTier::Unknown => filter.latency = Some(tier),
                _ => {
                    return Err(RotaError::InvalidRequest(format!(
                        "unknown latency tier: {}",
                        raw
                    )))
                }
            }
        }

        Ok(filter)
    }

    /// Same filter with the latency constraint replaced
    pub fn relaxed_to(&self, latency: Option<LatencyTier>) -> Self {
        Self {
            latency,
            ..self.clone()
        }
    }
}

/// Breakdown of the current pool snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolStats {
    pub total_nodes: usize,
    pub mode: String,
    pub by_latency: HashMap<String, usize>,
    pub by_region: HashMap<String, usize>,
    pub by_subscription: HashMap<String, usize>,
}
