//! Supervisor Loop
//!
//! [`Supervisor`] owns the tracked checks for one session and drives them
//! tick by tick. [`run_sessions`] wraps it in the outer loop that rebuilds
//! the session when the data directory moves on.

mod cancel;
mod core;
mod session;

pub use self::core::{Collaborators, SessionEnd, Supervisor, SupervisorSettings, TickOutcome};
pub use cancel::CancelToken;
pub use session::{run_sessions, SessionExit, SessionPolicy};
