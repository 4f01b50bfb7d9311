//! Orchestrator Events
//!
//! Notifications published to the presentation layer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::status::{Action, ElectionStatus};

/// Something the presentation layer may want to react to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OrchestratorEvent {
    /// The local election status changed
    StatusChanged {
        from: ElectionStatus,
        to: ElectionStatus,
        at: DateTime<Utc>,
    },
    /// An operation failed; carries a message for the operator
    Error(String),
    /// A poll succeeded, any previously shown error is stale
    ErrorCleared,
    /// A destructive action is waiting for the operator's decision
    ConfirmationRequested(Action),
    /// One node's initialization resolved
    NodeInitProgress {
        node: String,
        initialized: bool,
        ready: usize,
        total: usize,
    },
    /// Every roster node is initialized
    NodesReady,
    /// Decrypted results can be displayed
    ResultsReady,
}

impl std::fmt::Display for OrchestratorEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestratorEvent::StatusChanged { from, to, at } => {
                write!(f, "[{}] status {} -> {}", at.format("%H:%M:%S"), from, to)
            }
            OrchestratorEvent::Error(message) => write!(f, "error: {}", message),
            OrchestratorEvent::ErrorCleared => write!(f, "error cleared"),
            OrchestratorEvent::ConfirmationRequested(action) => {
                write!(f, "waiting for confirmation of {}", action)
            }
            OrchestratorEvent::NodeInitProgress {
                node,
                initialized,
                ready,
                total,
            } => write!(
                f,
                "node {} {} ({}/{} ready)",
                node,
                if *initialized { "initialized" } else { "failed" },
                ready,
                total
            ),
            OrchestratorEvent::NodesReady => write!(f, "all nodes initialized"),
            OrchestratorEvent::ResultsReady => write!(f, "results available"),
        }
    }
}
