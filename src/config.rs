//! Orchestrator Configuration
//!
//! This module provides the configuration structures for driving one
//! election: where the proxy lives, which nodes form the roster, and how
//! the nodes are reached during the DKG bootstrap.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::dkg::ProxyAddressMap;

/// Main orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Proxy connection configuration
    pub proxy: ProxyConfig,

    /// Election being driven
    pub election: ElectionConfig,

    /// Node identifier -> proxy address used for initialization
    #[serde(default)]
    pub nodes: ProxyAddressMap,

    /// Polling configuration
    #[serde(default)]
    pub polling: PollingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Proxy connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Base URL of the election proxy (e.g. http://127.0.0.1:9080)
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Election configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionConfig {
    /// Election identifier on the proxy
    pub id: String,

    /// Ordered roster of node identifiers
    pub roster: Vec<String>,
}

/// Polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay between two status queries in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, compact)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log to file path (optional)
    pub file: Option<PathBuf>,
}

// Default value functions
fn default_request_timeout() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    crate::poll::DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl OrchestratorConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: OrchestratorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.proxy.base_url.is_empty() {
            return Err(crate::Error::Config("proxy.base_url cannot be empty".into()));
        }

        if !self.proxy.base_url.starts_with("http://") && !self.proxy.base_url.starts_with("https://") {
            return Err(crate::Error::Config(format!(
                "proxy.base_url must be an http(s) URL, got '{}'",
                self.proxy.base_url
            )));
        }

        if self.election.id.is_empty() {
            return Err(crate::Error::Config("election.id cannot be empty".into()));
        }

        if self.election.roster.is_empty() {
            return Err(crate::Error::Config("election.roster cannot be empty".into()));
        }

        let mut seen = HashSet::new();
        for node in &self.election.roster {
            if !seen.insert(node.as_str()) {
                return Err(crate::Error::Config(format!(
                    "election.roster lists node '{}' more than once",
                    node
                )));
            }
        }

        for (node, _) in self.nodes.iter() {
            if !seen.contains(node) {
                return Err(crate::Error::Config(format!(
                    "nodes.{} is not part of election.roster",
                    node
                )));
            }
        }

        if self.polling.interval_ms == 0 {
            return Err(crate::Error::Config("polling.interval_ms must be positive".into()));
        }

        Ok(())
    }

    /// Roster nodes that have no proxy address configured
    pub fn nodes_missing_address(&self) -> Vec<&str> {
        self.election
            .roster
            .iter()
            .filter(|node| !self.nodes.contains(node))
            .map(String::as_str)
            .collect()
    }

    /// Get poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms)
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy.request_timeout_secs)
    }
}
