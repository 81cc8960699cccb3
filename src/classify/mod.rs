//! Pure classifiers used when recording node state
//!
//! - Latency tiering against the configured thresholds
//! - Region detection from node labels

pub mod latency;
pub mod region;

pub use latency::classify;
pub use region::{all_regions, detect, RegionInfo};
