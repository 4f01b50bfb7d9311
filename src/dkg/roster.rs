//! Roster Bookkeeping
//!
//! Proxy addresses of the roster nodes and the per-node initialization
//! flags aggregated into a single readiness signal.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Node identifier → proxy address used to reach the node's control endpoint.
///
/// Built once from the operator-confirmed addresses and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProxyAddressMap(BTreeMap<String, String>);

impl ProxyAddressMap {
    pub fn get(&self, node: &str) -> Option<&str> {
        self.0.get(node).map(String::as_str)
    }

    pub fn contains(&self, node: &str) -> bool {
        self.0.contains_key(node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(node, addr)| (node.as_str(), addr.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N, A> FromIterator<(N, A)> for ProxyAddressMap
where
    N: Into<String>,
    A: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, A)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(n, a)| (n.into(), a.into())).collect())
    }
}

/// Aggregate readiness of the roster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Not every roster member has an entry yet
    Indeterminate,
    /// Every roster member reported a successful initialization
    Ready,
    /// Every roster member has an entry but at least one is not initialized
    NotReady,
}

/// Per-node initialization flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeInitStatus {
    nodes: BTreeMap<String, bool>,
}

impl NodeInitStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an uninitialized entry for a node whose command was just issued
    pub fn begin(&mut self, node: &str) {
        self.nodes.insert(node.to_string(), false);
    }

    /// Record the result of a node's initialization
    pub fn record(&mut self, node: &str, initialized: bool) {
        self.nodes.insert(node.to_string(), initialized);
    }

    pub fn get(&self, node: &str) -> Option<bool> {
        self.nodes.get(node).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.nodes.iter().map(|(node, ok)| (node.as_str(), *ok))
    }

    /// Number of nodes reported initialized
    pub fn initialized_count(&self) -> usize {
        self.nodes.values().filter(|ok| **ok).count()
    }

    /// Evaluate readiness against a roster of `roster_len` nodes
    pub fn readiness(&self, roster_len: usize) -> Readiness {
        if self.nodes.len() != roster_len {
            return Readiness::Indeterminate;
        }
        if self.nodes.values().all(|ok| *ok) {
            Readiness::Ready
        } else {
            Readiness::NotReady
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_requires_every_entry() {
        let mut status = NodeInitStatus::new();
        assert_eq!(status.readiness(3), Readiness::Indeterminate);

        status.begin("a");
        status.begin("b");
        status.record("a", true);
        status.record("b", true);
        // Two true entries out of three roster members is not "all ready"
        assert_eq!(status.readiness(3), Readiness::Indeterminate);

        status.begin("c");
        assert_eq!(status.readiness(3), Readiness::NotReady);

        status.record("c", true);
        assert_eq!(status.readiness(3), Readiness::Ready);
        assert_eq!(status.initialized_count(), 3);
    }

    #[test]
    fn test_failed_node_blocks_readiness() {
        let mut status = NodeInitStatus::new();
        for node in ["a", "b", "c"] {
            status.begin(node);
        }
        status.record("a", true);
        status.record("b", true);
        status.record("c", false);

        assert_eq!(status.readiness(3), Readiness::NotReady);
        assert_eq!(status.get("c"), Some(false));
    }

    #[test]
    fn test_empty_roster() {
        assert_eq!(NodeInitStatus::new().readiness(0), Readiness::Ready);
    }

    #[test]
    fn test_proxy_map_from_pairs() {
        let map: ProxyAddressMap = [("node-b", "http://b:9080"), ("node-a", "http://a:9080")]
            .into_iter()
            .collect();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("node-a"), Some("http://a:9080"));
        assert!(!map.contains("node-c"));
        let nodes: Vec<_> = map.iter().map(|(n, _)| n).collect();
        assert_eq!(nodes, vec!["node-a", "node-b"]);
    }
}
