//! Transition Table
//!
//! Which action is legal from which status, which control endpoint it
//! targets, and what status results from it.
//!
//! ```text
//! Initial          -- node init flow --> InitializedNodes
//! InitializedNodes -- setup ----------> OnGoingSetup      (poll: Setup / fallback InitializedNodes)
//! Setup            -- open -----------> Open
//! Open             -- close ----------> Closed            (confirmation)
//! Open             -- cancel ---------> Canceled          (confirmation)
//! Closed           -- shuffle --------> OnGoingShuffle    (poll: ShuffledBallots / fallback Closed)
//! ShuffledBallots  -- beginDecryption > OnGoingDecryption (poll: DecryptedBallots / fallback ShuffledBallots)
//! DecryptedBallots -- automatic ------> ResultAvailable
//! ```

use super::{Action, ElectionStatus};
use crate::network::EndpointKind;

/// Status to wait for after an on-going action was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTarget {
    /// Endpoint queried for the authoritative status
    pub endpoint: EndpointKind,
    /// Status that ends the poll successfully
    pub target: ElectionStatus,
    /// Status restored if a query fails
    pub fallback: ElectionStatus,
}

/// Status committed once the remote command succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    /// The command settles the status on its own
    Immediate(ElectionStatus),
    /// The command starts a long-running operation
    OnGoing {
        status: ElectionStatus,
        poll: PollTarget,
    },
}

impl TransitionResult {
    /// Status to commit right after the command succeeds
    pub fn status(&self) -> ElectionStatus {
        match self {
            TransitionResult::Immediate(status) => *status,
            TransitionResult::OnGoing { status, .. } => *status,
        }
    }

    pub fn poll(&self) -> Option<PollTarget> {
        match self {
            TransitionResult::Immediate(_) => None,
            TransitionResult::OnGoing { poll, .. } => Some(*poll),
        }
    }
}

/// One edge of the election lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub source: ElectionStatus,
    pub action: Action,
    /// Endpoint the command is sent to
    pub endpoint: EndpointKind,
    pub result: TransitionResult,
}

/// The full table, in the order actions are offered to operators
pub const TRANSITIONS: [Transition; 6] = [
    Transition {
        source: ElectionStatus::InitializedNodes,
        action: Action::Setup,
        endpoint: EndpointKind::DkgActors,
        result: TransitionResult::OnGoing {
            status: ElectionStatus::OnGoingSetup,
            poll: PollTarget {
                endpoint: EndpointKind::DkgActors,
                target: ElectionStatus::Setup,
                fallback: ElectionStatus::InitializedNodes,
            },
        },
    },
    Transition {
        source: ElectionStatus::Setup,
        action: Action::Open,
        endpoint: EndpointKind::Election,
        result: TransitionResult::Immediate(ElectionStatus::Open),
    },
    Transition {
        source: ElectionStatus::Open,
        action: Action::Close,
        endpoint: EndpointKind::Election,
        result: TransitionResult::Immediate(ElectionStatus::Closed),
    },
    Transition {
        source: ElectionStatus::Open,
        action: Action::Cancel,
        endpoint: EndpointKind::Election,
        result: TransitionResult::Immediate(ElectionStatus::Canceled),
    },
    Transition {
        source: ElectionStatus::Closed,
        action: Action::Shuffle,
        endpoint: EndpointKind::Shuffle,
        result: TransitionResult::OnGoing {
            status: ElectionStatus::OnGoingShuffle,
            poll: PollTarget {
                endpoint: EndpointKind::Election,
                target: ElectionStatus::ShuffledBallots,
                fallback: ElectionStatus::Closed,
            },
        },
    },
    Transition {
        source: ElectionStatus::ShuffledBallots,
        action: Action::BeginDecryption,
        endpoint: EndpointKind::DkgActors,
        result: TransitionResult::OnGoing {
            status: ElectionStatus::OnGoingDecryption,
            // Submitted shares show up on the form, not on the actor
            poll: PollTarget {
                endpoint: EndpointKind::Election,
                target: ElectionStatus::DecryptedBallots,
                fallback: ElectionStatus::ShuffledBallots,
            },
        },
    },
];

/// Legal actions from `status`, in display order
pub fn available_actions(status: ElectionStatus) -> Vec<Action> {
    TRANSITIONS
        .iter()
        .filter(|t| t.source == status)
        .map(|t| t.action)
        .collect()
}

/// The table entry for `action`
pub fn transition(action: Action) -> &'static Transition {
    match action {
        Action::Setup => &TRANSITIONS[0],
        Action::Open => &TRANSITIONS[1],
        Action::Close => &TRANSITIONS[2],
        Action::Cancel => &TRANSITIONS[3],
        Action::Shuffle => &TRANSITIONS[4],
        Action::BeginDecryption => &TRANSITIONS[5],
    }
}

/// Poll that resolves the on-going `status`
pub fn poll_for(status: ElectionStatus) -> Option<PollTarget> {
    TRANSITIONS.iter().find_map(|t| match t.result {
        TransitionResult::OnGoing { status: s, poll } if s == status => Some(poll),
        _ => None,
    })
}

/// Status the orchestrator moves to on its own once `status` is reached
pub fn automatic_successor(status: ElectionStatus) -> Option<ElectionStatus> {
    match status {
        ElectionStatus::DecryptedBallots => Some(ElectionStatus::ResultAvailable),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_actions_per_status() {
        use ElectionStatus::*;

        let expected: [(ElectionStatus, Vec<Action>); 12] = [
            (Initial, vec![]),
            (InitializedNodes, vec![Action::Setup]),
            (OnGoingSetup, vec![]),
            (Setup, vec![Action::Open]),
            (Open, vec![Action::Close, Action::Cancel]),
            (Closed, vec![Action::Shuffle]),
            (Canceled, vec![]),
            (OnGoingShuffle, vec![]),
            (ShuffledBallots, vec![Action::BeginDecryption]),
            (OnGoingDecryption, vec![]),
            (DecryptedBallots, vec![]),
            (ResultAvailable, vec![]),
        ];

        for (status, actions) in expected {
            assert_eq!(available_actions(status), actions, "status {}", status);
        }
    }

    #[test]
    fn test_table_and_lookup_agree() {
        // Every action has exactly one table entry and the lookup returns it
        for action in Action::ALL {
            let entries: Vec<_> = TRANSITIONS.iter().filter(|t| t.action == action).collect();
            assert_eq!(entries.len(), 1, "action {}", action);
            assert_eq!(transition(action), entries[0]);
            assert!(available_actions(entries[0].source).contains(&action));
        }
    }

    #[test]
    fn test_ongoing_results_always_poll() {
        for t in TRANSITIONS {
            let status = t.result.status();
            assert_eq!(status.is_ongoing(), t.result.poll().is_some(), "action {}", t.action);
            if let Some(poll) = t.result.poll() {
                assert_eq!(poll.fallback, t.source);
                assert!(!poll.target.is_ongoing());
            }
        }
    }

    #[test]
    fn test_endpoint_routing() {
        assert_eq!(transition(Action::Setup).endpoint, EndpointKind::DkgActors);
        assert_eq!(transition(Action::Open).endpoint, EndpointKind::Election);
        assert_eq!(transition(Action::Shuffle).endpoint, EndpointKind::Shuffle);
        assert_eq!(
            transition(Action::Shuffle).result.poll().map(|p| p.endpoint),
            Some(EndpointKind::Election)
        );
        assert_eq!(transition(Action::BeginDecryption).endpoint, EndpointKind::DkgActors);
        assert_eq!(
            transition(Action::BeginDecryption).result.poll().map(|p| p.endpoint),
            Some(EndpointKind::Election)
        );
        assert_eq!(
            transition(Action::Setup).result.poll().map(|p| p.endpoint),
            Some(EndpointKind::DkgActors)
        );
    }

    #[test]
    fn test_poll_for_ongoing_statuses() {
        for status in ElectionStatus::ALL {
            assert_eq!(poll_for(status).is_some(), status.is_ongoing(), "status {}", status);
        }
        let poll = poll_for(ElectionStatus::OnGoingDecryption).unwrap();
        assert_eq!(poll.target, ElectionStatus::DecryptedBallots);
        assert_eq!(poll.fallback, ElectionStatus::ShuffledBallots);
    }

    #[test]
    fn test_automatic_successor() {
        assert_eq!(
            automatic_successor(ElectionStatus::DecryptedBallots),
            Some(ElectionStatus::ResultAvailable)
        );
        for status in ElectionStatus::ALL {
            if status != ElectionStatus::DecryptedBallots {
                assert_eq!(automatic_successor(status), None);
            }
        }
    }
}
