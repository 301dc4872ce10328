//! Bounded restart protocol for watched processes.

use chrono::{DateTime, Local};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::runner::{CommandRunner, SpawnOutcome};

use super::retry::RetryBudget;

/// Result of asking the policy to restart a failing process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    /// No restart command is configured; nothing was done.
    NotConfigured,
    /// The restart command was started.
    Spawned { attempt: u32 },
    /// Starting the command failed or it died straight away.
    SpawnFailed { attempt: u32, error: String },
    /// The retry budget is spent. Terminal for the session.
    Exhausted { attempts: u32 },
}

impl RestartOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RestartOutcome::Exhausted { .. })
    }
}

/// Restart command plus its retry bookkeeping.
#[derive(Debug, Clone)]
pub struct RestartPolicy {
    command: Option<String>,
    budget: RetryBudget,
}

impl RestartPolicy {
    pub fn new(command: Option<String>, max_retries: u32, reset_after: Duration) -> Self {
        Self {
            command: command.filter(|c| !c.trim().is_empty()),
            budget: RetryBudget::new(max_retries, reset_after),
        }
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn retries(&self) -> u32 {
        self.budget.attempts()
    }

    pub fn max_retries(&self) -> u32 {
        self.budget.max_attempts()
    }

    pub fn last_restart(&self) -> Option<DateTime<Local>> {
        self.budget.last_attempt()
    }

    /// Lazy counter reset, run on every state query of the process.
    pub fn observe(&mut self, name: &str, now: DateTime<Local>) {
        if self.budget.reset_if_quiet(now) {
            info!(process = %name, "restart counter reset after quiet period");
        }
    }

    /// Try to restart `name` with the configured command.
    pub fn restart(
        &mut self,
        name: &str,
        runner: &dyn CommandRunner,
        now: DateTime<Local>,
    ) -> RestartOutcome {
        let Some(command) = self.command.as_deref() else {
            debug!(process = %name, "no restart command configured");
            return RestartOutcome::NotConfigured;
        };

        let Some(attempt) = self.budget.try_consume(now) else {
            let attempts = self.budget.attempts();
            error!(process = %name, attempts, "restart retries exhausted");
            return RestartOutcome::Exhausted { attempts };
        };

        info!(
            process = %name,
            %command,
            attempt,
            max = self.max_retries(),
            "attempting to restart"
        );

        match runner.spawn(command) {
            Ok(SpawnOutcome::Exited {
                success: false,
                stderr,
            }) => {
                warn!(
                    process = %name,
                    stderr = %stderr.trim(),
                    "restart command terminated already"
                );
                RestartOutcome::SpawnFailed {
                    attempt,
                    error: format!("terminated already: {}", stderr.trim()),
                }
            }
            Ok(_) => {
                info!(process = %name, attempt, "restart command started");
                RestartOutcome::Spawned { attempt }
            }
            Err(e) => {
                error!(process = %name, error = %e, "failed to restart");
                RestartOutcome::SpawnFailed {
                    attempt,
                    error: format!("{e:#}"),
                }
            }
        }
    }
}
