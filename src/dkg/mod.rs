//! DKG Bootstrap Module
//!
//! Initializes the DKG actor of an election on every roster node and
//! tracks which nodes are ready.

mod coordinator;
mod roster;

pub use coordinator::{InitializationRound, NodeInitCoordinator, NodeInitResult};
pub use roster::{NodeInitStatus, ProxyAddressMap, Readiness};
