//! Proxy selection
//!
//! This module provides:
//! - The proxy pool (selection engine) over a registry snapshot
//! - Sequential, random, latency-first and weighted strategies
//! - Latency-based fallback when a filter matches nothing

pub mod pool;
pub mod rotation;

pub use pool::{PoolConfig, ProxyPool, MANUAL_SUBSCRIPTION};
pub use rotation::{create_selector, NodeSelector, PoolMode, WeightTable};
