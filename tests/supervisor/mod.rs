//! Supervisor scenarios driven by fake collaborators
//!
//! The inspector, command runner and notifier are replaced by in-memory
//! fakes so each tick is deterministic and nothing touches the real
//! process table.

pub mod data_dir;
pub mod heartbeat;
pub mod helpers;
pub mod notifier_auth;
pub mod restart_cycle;
pub mod sessions;

pub use helpers::*;
