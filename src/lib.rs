//! Rota Nodes - Node Registry and Selection Engine
//!
//! Keeps the authoritative record of subscriptions and per-node health for a
//! proxy pool, and answers "give me a proxy" queries against it.
//!
//! ## Features
//!
//! - Persistent registry of subscriptions and node state (single JSON document)
//! - Latency tier classification with configurable thresholds
//! - Region detection from node labels (flag emoji, country codes, city names)
//! - Sequential, random, latency-first and weighted selection strategies
//! - Filtering by latency tier, region and subscription with tier fallback
//! - Optional API key gate in front of selection

pub mod classify;
pub mod config;
pub mod error;
pub mod models;
pub mod proxy;
pub mod repository;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{Result, RotaError};
pub use proxy::{PoolConfig, PoolMode, ProxyPool};
pub use repository::NodeRegistry;
