//! Poll Reconciler
//!
//! Waits for a long-running remote operation to reach its target status
//! by querying the control plane at a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::network::{ControlPlane, Endpoint};
use crate::status::{ElectionStatus, PollTarget};

/// Default delay between two status queries
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// One polling loop
#[derive(Debug, Clone)]
pub struct PollSession {
    /// Endpoint queried for the authoritative status
    pub endpoint: Endpoint,
    /// Status that ends the loop successfully
    pub target: ElectionStatus,
    /// Status to restore if a query fails
    pub fallback: ElectionStatus,
    /// Stops the loop without committing anything
    pub cancel: CancellationToken,
}

impl PollSession {
    pub fn new(
        endpoint: Endpoint,
        target: ElectionStatus,
        fallback: ElectionStatus,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            endpoint,
            target,
            fallback,
            cancel,
        }
    }

    /// Build a session from a transition table poll entry
    pub fn for_target(poll: PollTarget, election_id: &str, cancel: CancellationToken) -> Self {
        Self::new(
            Endpoint::new(poll.endpoint, election_id),
            poll.target,
            poll.fallback,
            cancel,
        )
    }
}

/// Terminal result of a polling loop
#[derive(Debug)]
pub enum PollOutcome {
    /// The target status was observed
    Matched(ElectionStatus),
    /// A query failed; the fallback status must be restored
    Failed {
        fallback: ElectionStatus,
        error: Error,
    },
    /// The session was cancelled; nothing must be committed
    Cancelled,
}

/// Runs polling loops against the control plane
pub struct PollReconciler {
    plane: Arc<dyn ControlPlane>,
    interval: Duration,
}

impl PollReconciler {
    /// Create a new reconciler querying every `interval`
    pub fn new(plane: Arc<dyn ControlPlane>, interval: Duration) -> Self {
        Self { plane, interval }
    }

    /// Get the query interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Query until the target is observed, a query fails, or the session is
    /// cancelled. A single failed query ends the session.
    pub async fn run(&self, session: &PollSession) -> PollOutcome {
        // The first query waits one full interval after the command
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempts: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = session.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            attempts += 1;
            let observed = tokio::select! {
                biased;
                _ = session.cancel.cancelled() => break,
                result = self.plane.status(&session.endpoint) => result,
            };

            // A query that raced with cancellation must not produce a result
            if session.cancel.is_cancelled() {
                break;
            }

            match observed {
                Ok(status) if status == session.target => {
                    tracing::info!(
                        "{} reached {} after {} queries",
                        session.endpoint,
                        status,
                        attempts
                    );
                    return PollOutcome::Matched(status);
                }
                Ok(status) => {
                    tracing::debug!(
                        "{} is {} (waiting for {})",
                        session.endpoint,
                        status,
                        session.target
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        "Polling {} failed after {} queries: {}",
                        session.endpoint,
                        attempts,
                        error
                    );
                    return PollOutcome::Failed {
                        fallback: session.fallback,
                        error,
                    };
                }
            }
        }

        tracing::debug!("Polling {} cancelled after {} queries", session.endpoint, attempts);
        PollOutcome::Cancelled
    }
}
