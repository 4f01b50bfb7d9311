//! Election Status Model
//!
//! The closed set of election statuses, the commands that move an
//! election between them, and the pending-operation projection shown
//! to operators while a command is in flight.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an election
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElectionStatus {
    /// Created, nodes not yet initialized
    Initial,
    /// Every roster node has a DKG actor
    InitializedNodes,
    /// DKG setup started, waiting for the nodes to agree on a key
    OnGoingSetup,
    /// DKG finished, election can be opened
    Setup,
    /// Accepting ballots
    Open,
    /// No longer accepting ballots
    Closed,
    /// Aborted by an operator
    Canceled,
    /// Shuffle started, waiting for every node to shuffle
    OnGoingShuffle,
    /// Ballots shuffled, ready for decryption
    ShuffledBallots,
    /// Decryption started, waiting for the public shares
    OnGoingDecryption,
    /// Ballots decrypted
    DecryptedBallots,
    /// Results can be displayed
    ResultAvailable,
}

impl ElectionStatus {
    /// Every status, in lifecycle order
    pub const ALL: [ElectionStatus; 12] = [
        ElectionStatus::Initial,
        ElectionStatus::InitializedNodes,
        ElectionStatus::OnGoingSetup,
        ElectionStatus::Setup,
        ElectionStatus::Open,
        ElectionStatus::Closed,
        ElectionStatus::Canceled,
        ElectionStatus::OnGoingShuffle,
        ElectionStatus::ShuffledBallots,
        ElectionStatus::OnGoingDecryption,
        ElectionStatus::DecryptedBallots,
        ElectionStatus::ResultAvailable,
    ];

    /// Whether a long-running remote operation is in progress and the
    /// terminal status will only be learned by polling.
    pub fn is_ongoing(self) -> bool {
        matches!(
            self,
            ElectionStatus::OnGoingSetup
                | ElectionStatus::OnGoingShuffle
                | ElectionStatus::OnGoingDecryption
        )
    }

    /// Whether the election can no longer move forward
    pub fn is_terminal(self) -> bool {
        matches!(self, ElectionStatus::Canceled | ElectionStatus::ResultAvailable)
    }
}

impl std::fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ElectionStatus::Initial => "Initial",
            ElectionStatus::InitializedNodes => "InitializedNodes",
            ElectionStatus::OnGoingSetup => "OnGoingSetup",
            ElectionStatus::Setup => "Setup",
            ElectionStatus::Open => "Open",
            ElectionStatus::Closed => "Closed",
            ElectionStatus::Canceled => "Canceled",
            ElectionStatus::OnGoingShuffle => "OnGoingShuffle",
            ElectionStatus::ShuffledBallots => "ShuffledBallots",
            ElectionStatus::OnGoingDecryption => "OnGoingDecryption",
            ElectionStatus::DecryptedBallots => "DecryptedBallots",
            ElectionStatus::ResultAvailable => "ResultAvailable",
        };
        f.write_str(name)
    }
}

/// Status-changing command sent to the control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Setup,
    Open,
    Close,
    Cancel,
    Shuffle,
    BeginDecryption,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Setup,
        Action::Open,
        Action::Close,
        Action::Cancel,
        Action::Shuffle,
        Action::BeginDecryption,
    ];

    /// Wire identifier carried in the command body
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Setup => "setup",
            Action::Open => "open",
            Action::Close => "close",
            Action::Cancel => "cancel",
            Action::Shuffle => "shuffle",
            Action::BeginDecryption => "beginDecryption",
        }
    }

    /// Close and Cancel cannot be undone and need an explicit confirmation
    pub fn is_destructive(self) -> bool {
        matches!(self, Action::Close | Action::Cancel)
    }

    /// The pending operation shown while this action's command is in flight
    pub fn pending_operation(self) -> PendingOperation {
        match self {
            Action::Setup => PendingOperation::SettingUp,
            Action::Open => PendingOperation::Opening,
            Action::Close => PendingOperation::Closing,
            Action::Cancel => PendingOperation::Canceling,
            Action::Shuffle => PendingOperation::Shuffling,
            Action::BeginDecryption => PendingOperation::Decrypting,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<&str> = Action::ALL.iter().map(|a| a.as_str()).collect();
                format!("unknown action '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// What the orchestrator is currently doing on behalf of the operator.
///
/// A single tagged value instead of one flag per command, so two commands
/// can never appear to be in flight at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PendingOperation {
    #[default]
    None,
    Initializing,
    SettingUp,
    Opening,
    Closing,
    Canceling,
    Shuffling,
    Decrypting,
}

impl PendingOperation {
    pub fn is_none(self) -> bool {
        self == PendingOperation::None
    }
}

impl std::fmt::Display for PendingOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PendingOperation::None => write!(f, "NONE"),
            PendingOperation::Initializing => write!(f, "INITIALIZING"),
            PendingOperation::SettingUp => write!(f, "SETTING_UP"),
            PendingOperation::Opening => write!(f, "OPENING"),
            PendingOperation::Closing => write!(f, "CLOSING"),
            PendingOperation::Canceling => write!(f, "CANCELING"),
            PendingOperation::Shuffling => write!(f, "SHUFFLING"),
            PendingOperation::Decrypting => write!(f, "DECRYPTING"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&ElectionStatus::OnGoingShuffle).unwrap();
        assert_eq!(json, "\"OnGoingShuffle\"");

        let parsed: ElectionStatus = serde_json::from_str("\"ResultAvailable\"").unwrap();
        assert_eq!(parsed, ElectionStatus::ResultAvailable);
    }

    #[test]
    fn test_action_wire_format() {
        let json = serde_json::to_string(&Action::BeginDecryption).unwrap();
        assert_eq!(json, "\"beginDecryption\"");

        for action in Action::ALL {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
    }

    #[test]
    fn test_action_from_str() {
        assert_eq!("close".parse::<Action>().unwrap(), Action::Close);
        assert_eq!("BeginDecryption".parse::<Action>().unwrap(), Action::BeginDecryption);
        assert!("vote".parse::<Action>().is_err());
    }

    #[test]
    fn test_ongoing_statuses() {
        let ongoing: Vec<_> = ElectionStatus::ALL
            .into_iter()
            .filter(|s| s.is_ongoing())
            .collect();
        assert_eq!(
            ongoing,
            vec![
                ElectionStatus::OnGoingSetup,
                ElectionStatus::OnGoingShuffle,
                ElectionStatus::OnGoingDecryption,
            ]
        );
    }

    #[test]
    fn test_destructive_actions() {
        let destructive: Vec<_> = Action::ALL.into_iter().filter(|a| a.is_destructive()).collect();
        assert_eq!(destructive, vec![Action::Close, Action::Cancel]);
    }
}
