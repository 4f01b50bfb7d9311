//! Orchestrator Error Types

use thiserror::Error;

use crate::status::{Action, ElectionStatus, PendingOperation};

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Orchestrator error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Remote errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request to {endpoint} failed with status {status}: {body}")]
    Request {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    // Contract violations
    #[error("Endpoint {endpoint} does not accept action {action}")]
    EndpointMismatch { action: Action, endpoint: String },

    #[error("Action {action} is not allowed while the election is {status}")]
    IllegalAction {
        action: Action,
        status: ElectionStatus,
    },

    #[error("Nodes can only be initialized while the election is Initial (currently {0})")]
    InitializationNotAllowed(ElectionStatus),

    #[error("Operation already in progress: {0}")]
    OperationInProgress(PendingOperation),

    #[error("A confirmation for {0} is already pending")]
    ConcurrentConfirmation(Action),

    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Check if this error came from the remote control plane
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Request { .. } | Error::Decode { .. }
        )
    }

    /// Check if this error means the caller broke the orchestration contract.
    /// These are programming defects, not something to show an operator.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Error::EndpointMismatch { .. }
                | Error::IllegalAction { .. }
                | Error::InitializationNotAllowed(_)
                | Error::OperationInProgress(_)
                | Error::ConcurrentConfirmation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let remote = Error::Request {
            endpoint: "evoting/forms/abc".into(),
            status: 500,
            body: "boom".into(),
        };
        assert!(remote.is_remote());
        assert!(!remote.is_contract_violation());

        let violation = Error::ConcurrentConfirmation(Action::Close);
        assert!(violation.is_contract_violation());
        assert!(!violation.is_remote());

        assert!(!Error::Cancelled.is_remote());
        assert!(!Error::Cancelled.is_contract_violation());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::IllegalAction {
            action: Action::Open,
            status: ElectionStatus::Closed,
        };
        assert_eq!(
            err.to_string(),
            "Action open is not allowed while the election is Closed"
        );
    }
}
