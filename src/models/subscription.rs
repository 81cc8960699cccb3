use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Refresh interval assigned to subscriptions that do not specify one
pub const DEFAULT_REFRESH_INTERVAL: &str = "1h";

/// A named upstream feed that contributes nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Generated on insert when empty; immutable afterwards
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub enabled: bool,
    /// Duration text such as "1h" or "30m"
    #[serde(default)]
    pub refresh_interval: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_refresh_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub node_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// New enabled subscription without an id; the registry assigns one on insert
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            name: name.into(),
            url: url.into(),
            enabled: true,
            refresh_interval: String::new(),
            last_refresh_at: None,
            node_count: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }
}
