//! Network Module
//!
//! The control-plane interface the orchestrator drives, and its HTTP
//! implementation.

mod client;
mod endpoint;

pub use client::HttpControlPlane;
pub use endpoint::{Endpoint, EndpointKind, DKG_ACTORS_PATH};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::status::{Action, ElectionStatus};

/// Election-management endpoints exposed by the proxy.
///
/// Every call either completes or fails; transport details such as
/// headers, framing and timeouts belong to the implementation.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Send a status-changing command
    async fn update(&self, endpoint: &Endpoint, action: Action) -> Result<()>;

    /// Create the DKG actor of `election_id` on the node reachable at `proxy_address`
    async fn initialize_node(&self, election_id: &str, proxy_address: &str) -> Result<()>;

    /// Read the authoritative status
    async fn status(&self, endpoint: &Endpoint) -> Result<ElectionStatus>;
}

/// Read the status of `election_id` the way an operator would see it.
///
/// The form only knows the ledger statuses; InitializedNodes and Setup
/// live on the DKG actor. While the form reports Initial the actor is
/// consulted too, and a proxy without an actor means nothing was
/// initialized yet.
pub async fn authoritative_status(plane: &dyn ControlPlane, election_id: &str) -> Result<ElectionStatus> {
    let status = plane.status(&Endpoint::election(election_id)).await?;
    if status != ElectionStatus::Initial {
        return Ok(status);
    }

    match plane.status(&Endpoint::dkg_actors(election_id)).await {
        Ok(status) => Ok(status),
        Err(Error::Request { status, body, .. }) => {
            tracing::debug!("No DKG actor for election {} ({}: {})", election_id, status, body);
            Ok(ElectionStatus::Initial)
        }
        Err(e) => Err(e),
    }
}
