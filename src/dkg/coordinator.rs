//! Node Initialization Coordinator
//!
//! Fans one DKG initialization command out to every roster node and
//! yields each node's result as soon as it resolves.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::FutureExt;

use super::ProxyAddressMap;
use crate::error::Result;
use crate::network::ControlPlane;

/// Result of one node's initialization command
#[derive(Debug)]
pub struct NodeInitResult {
    pub node: String,
    pub proxy_address: String,
    pub result: Result<()>,
}

/// In-flight initialization commands of one round
pub struct InitializationRound {
    /// Nodes whose command was issued, in roster order
    pub issued: Vec<String>,
    /// Roster nodes without a configured proxy address
    pub skipped: Vec<String>,
    /// Results in completion order
    pub results: FuturesUnordered<BoxFuture<'static, NodeInitResult>>,
}

/// Issues initialization commands across the roster
pub struct NodeInitCoordinator {
    plane: Arc<dyn ControlPlane>,
    election_id: String,
}

impl NodeInitCoordinator {
    /// Create a new coordinator for `election_id`
    pub fn new(plane: Arc<dyn ControlPlane>, election_id: impl Into<String>) -> Self {
        Self {
            plane,
            election_id: election_id.into(),
        }
    }

    /// Issue one command per roster node that has an address.
    ///
    /// Commands run concurrently without ordering or throttling; a failed
    /// node does not affect the others and is never retried here.
    pub fn initialize_all(&self, roster: &[String], addresses: &ProxyAddressMap) -> InitializationRound {
        let mut issued = Vec::with_capacity(roster.len());
        let mut skipped = Vec::new();
        let results = FuturesUnordered::new();

        for node in roster {
            let Some(address) = addresses.get(node) else {
                tracing::warn!("No proxy address for node {}, skipping initialization", node);
                skipped.push(node.clone());
                continue;
            };

            let plane = Arc::clone(&self.plane);
            let election_id = self.election_id.clone();
            let node_id = node.clone();
            let proxy_address = address.to_string();

            tracing::info!("Initializing node {} via {}", node_id, proxy_address);
            issued.push(node.clone());

            results.push(
                async move {
                    let result = plane.initialize_node(&election_id, &proxy_address).await;
                    NodeInitResult {
                        node: node_id,
                        proxy_address,
                        result,
                    }
                }
                .boxed(),
            );
        }

        InitializationRound {
            issued,
            skipped,
            results,
        }
    }
}
