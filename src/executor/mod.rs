//! Executor Module
//!
//! Issues status-changing commands against the control plane.

mod command;

pub use command::CommandExecutor;
