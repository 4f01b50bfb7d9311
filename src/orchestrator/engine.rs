//! Action Orchestrator
//!
//! Owns the local status of one election. Exposes what can happen next,
//! makes it happen, and folds poll and node-initialization results back
//! into the status.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::OrchestratorEvent;
use crate::config::ElectionConfig;
use crate::confirm::{ConfirmationGate, Confirmer};
use crate::dkg::{NodeInitCoordinator, NodeInitStatus, ProxyAddressMap, Readiness};
use crate::error::{Error, Result};
use crate::executor::CommandExecutor;
use crate::network::ControlPlane;
use crate::poll::{PollOutcome, PollReconciler, PollSession};
use crate::status::{
    automatic_successor, available_actions, poll_for, transition, Action, ElectionStatus,
    PendingOperation,
};

const EVENT_CAPACITY: usize = 64;

/// Result of a requested action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The command was accepted and the status committed
    Applied(ElectionStatus),
    /// The operator declined the confirmation, nothing was sent
    Declined,
    /// The command failed; status is unchanged
    Failed(String),
}

/// Everything the orchestrator mutates
struct ElectionState {
    status: ElectionStatus,
    pending: PendingOperation,
    /// Token of the active poll session
    poll: Option<CancellationToken>,
    nodes: NodeInitStatus,
}

/// Resets the pending operation on every exit path
struct PendingGuard<'a> {
    orchestrator: &'a ActionOrchestrator,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.orchestrator.lock().pending = PendingOperation::None;
    }
}

/// Drives the lifecycle of one election
pub struct ActionOrchestrator {
    election_id: String,
    roster: Vec<String>,
    state: Mutex<ElectionState>,
    status_tx: watch::Sender<ElectionStatus>,
    events: broadcast::Sender<OrchestratorEvent>,
    executor: CommandExecutor,
    reconciler: PollReconciler,
    coordinator: NodeInitCoordinator,
    gate: ConfirmationGate,
    /// Root of every poll session; cancelled on teardown
    cancel: CancellationToken,
}

impl ActionOrchestrator {
    /// Create a new orchestrator for the election in `initial` status.
    ///
    /// Must be called inside a Tokio runtime: an on-going initial status
    /// immediately starts the matching poll session. `cancel` is owned by
    /// the caller and tears everything down when cancelled.
    pub fn new(
        election: &ElectionConfig,
        initial: ElectionStatus,
        plane: Arc<dyn ControlPlane>,
        confirmer: Arc<dyn Confirmer>,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let (status_tx, _) = watch::channel(initial);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let orchestrator = Arc::new(Self {
            election_id: election.id.clone(),
            roster: election.roster.clone(),
            state: Mutex::new(ElectionState {
                status: initial,
                pending: PendingOperation::None,
                poll: None,
                nodes: NodeInitStatus::new(),
            }),
            status_tx,
            events,
            executor: CommandExecutor::new(Arc::clone(&plane)),
            reconciler: PollReconciler::new(Arc::clone(&plane), poll_interval),
            coordinator: NodeInitCoordinator::new(plane, election.id.clone()),
            gate: ConfirmationGate::new(confirmer),
            cancel,
        });

        tracing::info!(
            "Orchestrating election {} ({} nodes), status {}",
            orchestrator.election_id,
            orchestrator.roster.len(),
            initial
        );

        {
            let mut state = orchestrator.lock();
            orchestrator.commit(&mut state, initial);
        }

        orchestrator
    }

    fn lock(&self) -> MutexGuard<'_, ElectionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: OrchestratorEvent) {
        // No subscriber is not an error
        let _ = self.events.send(event);
    }

    /// Get the election identifier
    pub fn election_id(&self) -> &str {
        &self.election_id
    }

    /// Get the roster
    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    /// Current local status
    pub fn current_status(&self) -> ElectionStatus {
        self.lock().status
    }

    /// Legal actions from the current status
    pub fn available_actions(&self) -> Vec<Action> {
        available_actions(self.current_status())
    }

    /// Operation currently in flight
    pub fn pending_operation(&self) -> PendingOperation {
        self.lock().pending
    }

    /// Snapshot of the per-node initialization flags
    pub fn node_init_status(&self) -> NodeInitStatus {
        self.lock().nodes.clone()
    }

    /// Whether a poll session is active
    pub fn is_polling(&self) -> bool {
        self.lock().poll.is_some()
    }

    /// Whether a confirmation for `action` is being awaited
    pub fn is_confirmation_pending(&self, action: Action) -> bool {
        self.gate.is_pending(action)
    }

    /// Subscribe to orchestrator events
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.events.subscribe()
    }

    /// Watch the local status
    pub fn watch_status(&self) -> watch::Receiver<ElectionStatus> {
        self.status_tx.subscribe()
    }

    /// Wait until no long-running operation is in progress, or teardown.
    pub async fn wait_until_settled(&self) -> ElectionStatus {
        let mut rx = self.status_tx.subscribe();
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = rx.wait_for(|status| !status.is_ongoing()) => {}
        }
        self.current_status()
    }

    /// Tear down: cancel the active poll session and any future ones
    pub fn shutdown(&self) {
        tracing::info!("Shutting down orchestrator for election {}", self.election_id);
        self.cancel.cancel();
        if let Some(token) = self.lock().poll.take() {
            token.cancel();
        }
    }

    /// Perform `action`.
    ///
    /// Destructive actions are confirmed first. Remote failures are
    /// recovered locally and reported as `Failed`; `Err` is reserved for
    /// requests that break the orchestration contract.
    pub async fn request_action(self: &Arc<Self>, action: Action) -> Result<ActionOutcome> {
        self.check_action(action)?;

        if action.is_destructive() {
            let confirmed = self
                .gate
                .request_confirmation_with(action, |action| {
                    self.emit(OrchestratorEvent::ConfirmationRequested(action))
                })
                .await?;
            if !confirmed {
                tracing::info!("{} declined, nothing sent", action);
                return Ok(ActionOutcome::Declined);
            }
        }

        // The confirmation may have suspended for a while
        let _pending = self.begin_operation(action)?;

        let endpoint = CommandExecutor::endpoint_for(action, &self.election_id);
        let result = self.executor.execute(action, &endpoint).await;
        match result {
            Ok(()) => {
                let mut state = self.lock();
                self.commit(&mut state, transition(action).result.status());
                Ok(ActionOutcome::Applied(state.status))
            }
            Err(e) if e.is_contract_violation() => Err(e),
            Err(e) => {
                let message = format!("Failed to {} election {}: {}", action, self.election_id, e);
                self.emit(OrchestratorEvent::Error(message.clone()));
                Ok(ActionOutcome::Failed(message))
            }
        }
    }

    fn check_action(&self, action: Action) -> Result<()> {
        Self::check_legal(&self.lock(), action)
    }

    fn check_legal(state: &ElectionState, action: Action) -> Result<()> {
        if !state.pending.is_none() {
            return Err(Error::OperationInProgress(state.pending));
        }
        if transition(action).source != state.status {
            return Err(Error::IllegalAction {
                action,
                status: state.status,
            });
        }
        Ok(())
    }

    /// Re-check legality and claim the pending slot under one lock
    fn begin_operation(&self, action: Action) -> Result<PendingGuard<'_>> {
        let mut state = self.lock();
        Self::check_legal(&state, action)?;
        state.pending = action.pending_operation();
        Ok(PendingGuard { orchestrator: self })
    }

    /// Initialize every roster node that has an address.
    ///
    /// Legal only from Initial. Returns once every issued command resolved;
    /// on aggregate readiness the status advances to InitializedNodes.
    /// Failed nodes are not retried: the whole flow must be triggered again.
    pub async fn trigger_node_initialization(
        self: &Arc<Self>,
        addresses: &ProxyAddressMap,
    ) -> Result<Readiness> {
        let _pending = {
            let mut state = self.lock();
            if !state.pending.is_none() {
                return Err(Error::OperationInProgress(state.pending));
            }
            if state.status != ElectionStatus::Initial {
                return Err(Error::InitializationNotAllowed(state.status));
            }
            state.pending = PendingOperation::Initializing;
            state.nodes = NodeInitStatus::new();
            PendingGuard {
                orchestrator: Arc::as_ref(self),
            }
        };

        let total = self.roster.len();
        let mut round = self.coordinator.initialize_all(&self.roster, addresses);
        {
            let mut state = self.lock();
            for node in &round.issued {
                state.nodes.begin(node);
            }
        }
        if !round.skipped.is_empty() {
            tracing::warn!(
                "{} of {} nodes have no proxy address, readiness cannot be reached",
                round.skipped.len(),
                total
            );
        }

        loop {
            let done = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                next = round.results.next() => match next {
                    Some(done) => done,
                    None => break,
                },
            };

            let mut state = self.lock();
            let initialized = match &done.result {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Node {} failed to initialize: {}", done.node, e);
                    self.emit(OrchestratorEvent::Error(format!(
                        "Failed to initialize node {} ({}): {}",
                        done.node, done.proxy_address, e
                    )));
                    false
                }
            };
            state.nodes.record(&done.node, initialized);
            self.emit(OrchestratorEvent::NodeInitProgress {
                node: done.node,
                initialized,
                ready: state.nodes.initialized_count(),
                total,
            });

            self.advance_if_ready(&mut state);
        }

        // A round with nothing issued never enters the loop body
        let mut state = self.lock();
        self.advance_if_ready(&mut state);
        Ok(state.nodes.readiness(total))
    }

    /// Move to InitializedNodes once every roster node is initialized
    fn advance_if_ready(self: &Arc<Self>, state: &mut ElectionState) {
        let total = self.roster.len();
        if state.nodes.readiness(total) == Readiness::Ready && state.status == ElectionStatus::Initial {
            tracing::info!("All {} nodes initialized", total);
            self.emit(OrchestratorEvent::NodesReady);
            self.commit(state, ElectionStatus::InitializedNodes);
        }
    }

    /// Start `session`, superseding any active one.
    ///
    /// The caller owns the session's token and is responsible for
    /// cancelling it once the election is no longer of interest.
    pub fn start_polling(self: &Arc<Self>, session: PollSession) -> JoinHandle<()> {
        let mut state = self.lock();
        self.spawn_poll(&mut state, session)
    }

    fn spawn_poll(self: &Arc<Self>, state: &mut ElectionState, session: PollSession) -> JoinHandle<()> {
        if let Some(previous) = state.poll.replace(session.cancel.clone()) {
            tracing::debug!("Superseding active poll session");
            previous.cancel();
        }

        tracing::info!(
            "Polling {} every {:?} for {}",
            session.endpoint,
            self.reconciler.interval(),
            session.target
        );

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = this.reconciler.run(&session).await;
            this.finish_poll(&session, outcome);
        })
    }

    fn finish_poll(self: &Arc<Self>, session: &PollSession, outcome: PollOutcome) {
        let mut state = self.lock();

        // Supersession and teardown cancel under this lock, so a session
        // that is still live here is the active one.
        if session.cancel.is_cancelled() {
            tracing::debug!("Dropping outcome of cancelled poll on {}", session.endpoint);
            return;
        }
        state.poll = None;

        match outcome {
            PollOutcome::Matched(status) => {
                self.emit(OrchestratorEvent::ErrorCleared);
                self.commit(&mut state, status);
            }
            PollOutcome::Failed { fallback, error } => {
                self.emit(OrchestratorEvent::Error(format!(
                    "Failed to fetch the status of election {}: {}",
                    self.election_id, error
                )));
                self.commit(&mut state, fallback);
            }
            PollOutcome::Cancelled => {}
        }
    }

    /// Set the status and apply its consequences: automatic successors,
    /// starting or stopping the poll session.
    fn commit(self: &Arc<Self>, state: &mut ElectionState, status: ElectionStatus) {
        let changed = self.set_status(state, status);

        if let Some(next) = automatic_successor(state.status) {
            self.set_status(state, next);
            tracing::info!("Results of election {} are available", self.election_id);
            self.emit(OrchestratorEvent::ResultsReady);
        }

        if state.status.is_ongoing() {
            if changed || state.poll.is_none() {
                if let Some(poll) = poll_for(state.status) {
                    let session = PollSession::for_target(poll, &self.election_id, self.cancel.child_token());
                    self.spawn_poll(state, session);
                }
            }
        } else if let Some(token) = state.poll.take() {
            token.cancel();
        }
    }

    fn set_status(&self, state: &mut ElectionState, status: ElectionStatus) -> bool {
        let from = state.status;
        if from == status {
            return false;
        }

        state.status = status;
        self.status_tx.send_replace(status);
        tracing::info!("Election {}: {} -> {}", self.election_id, from, status);
        self.emit(OrchestratorEvent::StatusChanged {
            from,
            to: status,
            at: Utc::now(),
        });
        true
    }
}
