//! Edge detection on top of a resource check.

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::checks::{Check, Inspector};
use crate::models::CheckState;

/// A check plus the last state the supervisor observed for it.
#[derive(Debug, Clone)]
pub struct Tracked {
    check: Check,
    last_state: CheckState,
}

impl Tracked {
    /// Evaluate once to capture the baseline. The baseline is never
    /// reported as a change.
    pub fn new(mut check: Check, inspector: &dyn Inspector, now: DateTime<Local>) -> Self {
        let last_state = check.evaluate(inspector, now);
        Self { check, last_state }
    }

    pub fn check(&self) -> &Check {
        &self.check
    }

    pub fn check_mut(&mut self) -> &mut Check {
        &mut self.check
    }

    pub fn last_state(&self) -> CheckState {
        self.last_state
    }

    /// Evaluate and compare with the stored state, storing the new one.
    /// True only on a transition.
    pub fn just_changed(&mut self, inspector: &dyn Inspector, now: DateTime<Local>) -> bool {
        let state = self.check.evaluate(inspector, now);
        if state == self.last_state {
            return false;
        }

        self.last_state = state;
        let description = self.describe(inspector, now);
        match state {
            CheckState::Fail => warn!(check = %description, "state change to FAIL"),
            CheckState::Ok => info!(check = %description, "state change to OK"),
        }
        true
    }

    pub fn describe(&self, inspector: &dyn Inspector, now: DateTime<Local>) -> String {
        self.check.describe(self.last_state, inspector, now)
    }
}
