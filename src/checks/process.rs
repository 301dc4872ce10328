//! Long-lived processes that must stay up.

use chrono::{DateTime, Local};
use tracing::debug;

use crate::models::CheckState;
use crate::monitor::restart::{RestartOutcome, RestartPolicy};
use crate::runner::CommandRunner;

use super::inspect::Inspector;

/// FAIL when no process called `name` is running.
#[derive(Debug, Clone)]
pub struct ProcessCheck {
    name: String,
    policy: RestartPolicy,
}

impl ProcessCheck {
    pub fn new(name: impl Into<String>, policy: RestartPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &RestartPolicy {
        &self.policy
    }

    /// Process lookup; also lets the retry counter lapse after a quiet period.
    pub fn evaluate(&mut self, inspector: &dyn Inspector, now: DateTime<Local>) -> CheckState {
        self.policy.observe(&self.name, now);

        match inspector.find_process(&self.name) {
            Ok(pids) => CheckState::from_healthy(!pids.is_empty()),
            Err(e) => {
                debug!(process = %self.name, error = %e, "process lookup failed");
                CheckState::Fail
            }
        }
    }

    pub fn restart(&mut self, runner: &dyn CommandRunner, now: DateTime<Local>) -> RestartOutcome {
        self.policy.restart(&self.name, runner, now)
    }

    pub(super) fn extra_text(&self, inspector: &dyn Inspector) -> String {
        let mut msg = String::new();
        if let Ok(pids) = inspector.find_process(&self.name) {
            if !pids.is_empty() {
                let pids: Vec<String> = pids.iter().map(u32::to_string).collect();
                msg.push_str(&format!(", pid {}", pids.join(" ")));
            }
        }
        if self.policy.retries() > 0 {
            msg.push_str(&format!(
                ", restarts {}/{}",
                self.policy.retries(),
                self.policy.max_retries()
            ));
        }
        msg
    }
}
