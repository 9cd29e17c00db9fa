//! Connection settings for the Elasticsearch engine.

use serde::{Deserialize, Serialize};
use std::fmt;

fn default_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_refresh() -> bool {
    true
}

/// Settings of one cluster connection.
///
/// Every field has a default, so a partial document such as `{"url": "http://es:9200"}`
/// deserializes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Base URL of the cluster.
    #[serde(default = "default_url")]
    pub url: String,
    /// Basic auth user. No credentials are sent when unset.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Per-request timeout of the HTTP client.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Whether document writes ask the engine to refresh before acknowledging.
    #[serde(default = "default_refresh")]
    pub refresh: bool,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
            refresh: default_refresh(),
        }
    }
}

impl fmt::Debug for ElasticsearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElasticsearchConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("refresh", &self.refresh)
            .finish()
    }
}
