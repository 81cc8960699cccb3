use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Administrative status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Enabled,
    Disabled,
    Blacklisted,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Enabled => "enabled",
            NodeStatus::Disabled => "disabled",
            NodeStatus::Blacklisted => "blacklisted",
        }
    }

    /// Accepts both the status names and the action verbs used by the API
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "enabled" | "enable" => Some(NodeStatus::Enabled),
            "disabled" | "disable" => Some(NodeStatus::Disabled),
            "blacklisted" | "blacklist" => Some(NodeStatus::Blacklisted),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Latency bucket derived from a measurement and the configured thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LatencyTier {
    Low,
    Medium,
    High,
    #[default]
    Unknown,
}

impl LatencyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            LatencyTier::Low => "low",
            LatencyTier::Medium => "medium",
            LatencyTier::High => "high",
            LatencyTier::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(LatencyTier::Low),
            "medium" => Some(LatencyTier::Medium),
            "high" => Some(LatencyTier::High),
            "unknown" => Some(LatencyTier::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for LatencyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Thresholds used to bucket latency measurements
///
/// `low_threshold` must not exceed `medium_threshold` for the tiers to be
/// monotonic; this is not enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyConfig {
    /// Upper bound (inclusive) of the low tier, in milliseconds
    pub low_threshold: i64,
    /// Upper bound (inclusive) of the medium tier, in milliseconds
    pub medium_threshold: i64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            low_threshold: 100,
            medium_threshold: 300,
        }
    }
}

impl LatencyConfig {
    pub fn is_monotonic(&self) -> bool {
        self.low_threshold <= self.medium_threshold
    }
}

/// Sentinel latency for nodes that have not been measured
pub const UNKNOWN_LATENCY: i64 = -1;

fn unknown_latency() -> i64 {
    UNKNOWN_LATENCY
}

fn default_available() -> bool {
    true
}

/// One proxy endpoint with its observed health and latency state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub uri: String,
    /// Local listening port, 0 when not yet assigned
    #[serde(default)]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
    /// Latency in milliseconds, negative when unknown
    #[serde(default = "unknown_latency")]
    pub latency: i64,
    /// Re-derived from `latency` whenever the registry loads
    #[serde(default)]
    pub latency_level: LatencyTier,
    #[serde(default)]
    pub status: NodeStatus,
    /// Missing entries count as available until the next probe says otherwise
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failure_count: u32,
    #[serde(default)]
    pub success_count: u64,
}

impl Node {
    /// Create an enabled, available node with unknown latency
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            port: 0,
            subscription_id: None,
            subscription_name: None,
            region: None,
            region_name: None,
            latency: UNKNOWN_LATENCY,
            latency_level: LatencyTier::Unknown,
            status: NodeStatus::Enabled,
            available: true,
            last_check_at: None,
            failure_count: 0,
            success_count: 0,
        }
    }

    /// Registry key: the name, or the URI when the name is empty
    pub fn key(&self) -> &str {
        if self.name.is_empty() {
            &self.uri
        } else {
            &self.name
        }
    }

    /// A node is selectable when it is enabled and reported available
    pub fn is_selectable(&self) -> bool {
        self.status == NodeStatus::Enabled && self.available
    }

    /// Address clients should dial for this node
    pub fn proxy_url(&self) -> String {
        if self.port == 0 {
            self.uri.clone()
        } else {
            format!("http://127.0.0.1:{}", self.port)
        }
    }

    /// True when the node belongs to the subscription with this id or display name
    pub fn belongs_to(&self, subscription: &str) -> bool {
        self.subscription_id.as_deref() == Some(subscription)
            || self.subscription_name.as_deref() == Some(subscription)
    }
}

/// Raw endpoint descriptor produced by the subscription parser
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NodeDescriptor {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub subscription_name: Option<String>,
}

impl NodeDescriptor {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> &str {
        if self.name.is_empty() {
            &self.uri
        } else {
            &self.name
        }
    }
}

/// Outcome of one liveness probe, as reported by the proxy engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ProbeResult {
    /// Latency in milliseconds, negative when the probe could not measure it
    pub latency_ms: i64,
    pub available: bool,
    pub failure_count: u32,
    pub success_count: u64,
}
