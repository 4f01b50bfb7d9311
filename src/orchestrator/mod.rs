//! Orchestrator Module
//!
//! Drives one election through its lifecycle and publishes what happens
//! to the presentation layer.

mod engine;
mod events;

pub use engine::{ActionOrchestrator, ActionOutcome};
pub use events::OrchestratorEvent;
