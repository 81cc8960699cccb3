//! Latency tier classification

use crate::models::{LatencyConfig, LatencyTier};

/// Bucket a latency measurement using the configured thresholds
///
/// Negative latency means "not measured" and maps to [`LatencyTier::Unknown`].
/// Both thresholds are inclusive upper bounds.
pub fn classify(latency_ms: i64, config: &LatencyConfig) -> LatencyTier {
    if latency_ms < 0 {
        LatencyTier::Unknown
    } else if latency_ms <= config.low_threshold {
        LatencyTier::Low
    } else if latency_ms <= config.medium_threshold {
        LatencyTier::Medium
    } else {
        LatencyTier::High
    }
}
