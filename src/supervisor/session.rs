//! Outer session loop.
//!
//! A session is one [`Supervisor`] bound to one data directory. When a new
//! data directory appears the session is torn down and rebuilt, within a
//! bounded budget that resets after a quiet period.

use anyhow::Result;
use chrono::Local;
use std::time::Duration;
use tracing::{error, info, info_span, warn};

use crate::models::constants::{MAX_SESSION_RESTARTS, RESET_RETRIES_AFTER, SESSION_RESTART_DELAY};
use crate::monitor::RetryBudget;

use super::cancel::CancelToken;
use super::core::{SessionEnd, Supervisor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub max_restarts: u32,
    pub reset_after: Duration,
    pub restart_delay: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            max_restarts: MAX_SESSION_RESTARTS,
            reset_after: RESET_RETRIES_AFTER,
            restart_delay: SESSION_RESTART_DELAY,
        }
    }
}

/// Why the process should exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionExit {
    Interrupted,
    Fatal { reason: String },
}

impl SessionExit {
    pub fn exit_code(&self) -> u8 {
        match self {
            SessionExit::Interrupted => 0,
            SessionExit::Fatal { .. } => 1,
        }
    }
}

/// Build and run sessions until interrupted or a fatal condition.
///
/// `build` is called for every session; a build error is fatal unless it
/// was caused by cancellation.
pub fn run_sessions<F>(mut build: F, policy: SessionPolicy, cancel: &CancelToken) -> SessionExit
where
    F: FnMut() -> Result<Supervisor>,
{
    let mut budget = RetryBudget::new(policy.max_restarts, policy.reset_after);
    let mut session: u32 = 0;

    loop {
        session += 1;

        let mut supervisor = match build() {
            Ok(supervisor) => supervisor,
            Err(_) if cancel.is_cancelled() => return SessionExit::Interrupted,
            Err(e) => {
                error!(error = %format!("{e:#}"), "failed to start session");
                return SessionExit::Fatal {
                    reason: format!("{e:#}"),
                };
            }
        };

        let directory = supervisor
            .watcher()
            .and_then(|w| w.current())
            .unwrap_or("-")
            .to_string();
        let span = info_span!("session", session, %directory);
        let _enter = span.enter();

        match supervisor.run() {
            SessionEnd::Interrupted => return SessionExit::Interrupted,
            SessionEnd::Fatal { reason } => {
                error!(%reason, "session ended fatally");
                return SessionExit::Fatal { reason };
            }
            SessionEnd::NewDirectory { directory } => {
                let Some(restart) = budget.try_consume(Local::now()) else {
                    let reason = format!(
                        "new data directory {directory} found but session restarts exhausted ({} in a row)",
                        budget.attempts()
                    );
                    error!(%reason, "not restarting session");
                    return SessionExit::Fatal { reason };
                };

                info!(%directory, restart, max = budget.max_attempts(), "restarting session");
            }
        }

        drop(supervisor);
        if !cancel.sleep(policy.restart_delay) {
            warn!("interrupted before the next session started");
            return SessionExit::Interrupted;
        }
    }
}
