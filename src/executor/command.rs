//! Command Executor
//!
//! Sends one status-changing command to the control plane. Polling and
//! status bookkeeping belong to the caller.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::network::{ControlPlane, Endpoint};
use crate::status::{transition, Action};

/// Issues status-changing commands
pub struct CommandExecutor {
    plane: Arc<dyn ControlPlane>,
}

impl CommandExecutor {
    /// Create a new command executor
    pub fn new(plane: Arc<dyn ControlPlane>) -> Self {
        Self { plane }
    }

    /// Endpoint that accepts `action` for `election_id`
    pub fn endpoint_for(action: Action, election_id: &str) -> Endpoint {
        Endpoint::new(transition(action).endpoint, election_id)
    }

    /// Execute `action` against `endpoint`.
    ///
    /// Issues exactly one remote command. `Ok` means the control plane
    /// accepted it; an endpoint that does not match the action is rejected
    /// before anything is sent.
    pub async fn execute(&self, action: Action, endpoint: &Endpoint) -> Result<()> {
        let expected = transition(action).endpoint;
        if endpoint.kind != expected {
            tracing::error!(
                "Refusing to send {} to {} (expected a {} endpoint)",
                action,
                endpoint,
                expected
            );
            return Err(Error::EndpointMismatch {
                action,
                endpoint: endpoint.path(),
            });
        }

        tracing::info!("Sending {} to {}", action, endpoint);

        match self.plane.update(endpoint, action).await {
            Ok(()) => {
                tracing::info!("Command {} accepted for election {}", action, endpoint.election_id);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Command {} failed: {}", action, e);
                Err(e)
            }
        }
    }
}
