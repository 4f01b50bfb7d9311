//! Poll Module
//!
//! Reconciles local status with the authoritative status by polling.

mod reconciler;

pub use reconciler::{PollOutcome, PollReconciler, PollSession, DEFAULT_POLL_INTERVAL};
