//! Confirmation Gate
//!
//! Destructive actions wait for an explicit operator decision before
//! any command is sent.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::status::Action;

/// Asks an operator to confirm an action
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Confirmer: Send + Sync {
    /// Resolve to the operator's decision
    async fn confirm(&self, action: Action) -> bool;
}

/// Confirms everything (non-interactive use)
pub struct AutoConfirm;

#[async_trait]
impl Confirmer for AutoConfirm {
    async fn confirm(&self, _action: Action) -> bool {
        true
    }
}

/// Gate allowing at most one pending confirmation per action
pub struct ConfirmationGate {
    confirmer: Arc<dyn Confirmer>,
    pending: Mutex<HashSet<Action>>,
}

/// Clears the pending flag when the decision is known or the wait is dropped
struct PendingFlag<'a> {
    pending: &'a Mutex<HashSet<Action>>,
    action: Action,
}

impl Drop for PendingFlag<'_> {
    fn drop(&mut self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.remove(&self.action);
    }
}

impl ConfirmationGate {
    /// Create a new gate asking `confirmer`
    pub fn new(confirmer: Arc<dyn Confirmer>) -> Self {
        Self {
            confirmer,
            pending: Mutex::new(HashSet::new()),
        }
    }

    /// Whether a confirmation for `action` is being awaited
    pub fn is_pending(&self, action: Action) -> bool {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.contains(&action)
    }

    /// Ask for a decision on `action`.
    ///
    /// A second request for the same action while one is pending is a
    /// contract violation and fails with `ConcurrentConfirmation`.
    pub async fn request_confirmation(&self, action: Action) -> Result<bool> {
        self.request_confirmation_with(action, |_| {}).await
    }

    /// Same as `request_confirmation`, calling `on_pending` once the request
    /// is accepted and before the decision is awaited. Not called when the
    /// request is rejected.
    pub async fn request_confirmation_with<F>(&self, action: Action, on_pending: F) -> Result<bool>
    where
        F: FnOnce(Action) + Send,
    {
        {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            if !pending.insert(action) {
                tracing::error!("Confirmation for {} requested while one is already pending", action);
                return Err(Error::ConcurrentConfirmation(action));
            }
        }
        let _flag = PendingFlag {
            pending: &self.pending,
            action,
        };

        on_pending(action);
        tracing::info!("Waiting for confirmation of {}", action);
        let confirmed = self.confirmer.confirm(action).await;
        tracing::info!(
            "Confirmation of {} {}",
            action,
            if confirmed { "granted" } else { "denied" }
        );

        Ok(confirmed)
    }
}
