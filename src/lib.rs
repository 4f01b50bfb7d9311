//! E-Voting Orchestrator - Election Lifecycle Control
//!
//! Drives a single election of a distributed e-voting system through its
//! administrative lifecycle by issuing commands to the proxy's control plane
//! and reconciling the local view with the authoritative status.
//!
//! # Architecture
//!
//! The orchestrator owns the local status of one election. Every action is
//! looked up in a static transition table, sent to the endpoint that owns
//! it, and committed locally once accepted. Long-running operations
//! (DKG setup, shuffle, decryption) enter an on-going status that a poll
//! session resolves against the authoritative status.
//!
//! # Features
//!
//! - Transition table with per-action endpoint routing
//! - Cancellable polling of long-running operations
//! - Concurrent DKG actor initialization across the roster
//! - Confirmation gate for destructive actions (close, cancel)
//! - Event stream for presentation layers

pub mod config;
pub mod confirm;
pub mod dkg;
pub mod error;
pub mod executor;
pub mod network;
pub mod orchestrator;
pub mod poll;
pub mod status;

#[cfg(test)]
mod testing;

pub use config::OrchestratorConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::OrchestratorConfig;
    pub use crate::confirm::{AutoConfirm, Confirmer};
    pub use crate::dkg::{NodeInitStatus, ProxyAddressMap, Readiness};
    pub use crate::error::{Error, Result};
    pub use crate::network::{ControlPlane, Endpoint, HttpControlPlane};
    pub use crate::orchestrator::{ActionOrchestrator, ActionOutcome, OrchestratorEvent};
    pub use crate::status::{Action, ElectionStatus, PendingOperation};
}
