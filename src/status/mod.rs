//! Status Module
//!
//! Election statuses, actions, and the lifecycle transition table.

mod model;
pub mod transitions;

pub use model::{Action, ElectionStatus, PendingOperation};
pub use transitions::{
    automatic_successor, available_actions, poll_for, transition, PollTarget, Transition, TransitionResult,
};
