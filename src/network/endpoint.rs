//! Control Endpoints
//!
//! Addresses of the election-management resources on the proxy.

use serde::{Deserialize, Serialize};

use crate::status::ElectionStatus;

/// Resource family on the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointKind {
    /// The election (form) itself: open, close, cancel, status
    Election,
    /// The DKG actors of the election: setup, decryption, status
    DkgActors,
    /// The shuffle service of the election
    Shuffle,
}

impl EndpointKind {
    fn prefix(self) -> &'static str {
        match self {
            EndpointKind::Election => "evoting/forms",
            EndpointKind::DkgActors => "evoting/services/dkg/actors",
            EndpointKind::Shuffle => "evoting/services/shuffle",
        }
    }
}

impl EndpointKind {
    /// Map a numeric status code reported by this endpoint.
    ///
    /// The election resource reports the ledger status of the form. The DKG
    /// actor reports its own status: 0 once the actor exists, 1 once the
    /// key is set up. On-going statuses are local to the orchestrator and
    /// never come over the wire.
    pub fn decode_status(self, code: u16) -> Option<ElectionStatus> {
        match self {
            EndpointKind::Election | EndpointKind::Shuffle => match code {
                0 => Some(ElectionStatus::Initial),
                1 => Some(ElectionStatus::Open),
                2 => Some(ElectionStatus::Closed),
                3 => Some(ElectionStatus::ShuffledBallots),
                // Public shares submitted
                4 => Some(ElectionStatus::DecryptedBallots),
                5 => Some(ElectionStatus::ResultAvailable),
                6 => Some(ElectionStatus::Canceled),
                _ => None,
            },
            EndpointKind::DkgActors => match code {
                0 => Some(ElectionStatus::InitializedNodes),
                1 => Some(ElectionStatus::Setup),
                _ => None,
            },
        }
    }
}

impl std::fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointKind::Election => write!(f, "ELECTION"),
            EndpointKind::DkgActors => write!(f, "DKG_ACTORS"),
            EndpointKind::Shuffle => write!(f, "SHUFFLE"),
        }
    }
}

/// A control endpoint bound to one election
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub kind: EndpointKind,
    pub election_id: String,
}

impl Endpoint {
    pub fn new(kind: EndpointKind, election_id: impl Into<String>) -> Self {
        Self {
            kind,
            election_id: election_id.into(),
        }
    }

    pub fn election(election_id: impl Into<String>) -> Self {
        Self::new(EndpointKind::Election, election_id)
    }

    pub fn dkg_actors(election_id: impl Into<String>) -> Self {
        Self::new(EndpointKind::DkgActors, election_id)
    }

    pub fn shuffle(election_id: impl Into<String>) -> Self {
        Self::new(EndpointKind::Shuffle, election_id)
    }

    /// Path relative to the proxy base URL
    pub fn path(&self) -> String {
        format!("{}/{}", self.kind.prefix(), self.election_id)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

/// Path of the collection used to create DKG actors on the nodes
pub const DKG_ACTORS_PATH: &str = "evoting/services/dkg/actors";
