use chrono::{DateTime, Local};
use std::time::Duration;

/// Bounded retry counter with a quiet-period reset.
///
/// Counts consecutive attempts and refuses new ones once `max_attempts`
/// is reached. If more than `reset_after` passes between two attempts the
/// counter starts over, so something that fails rarely but recovers is not
/// penalised forever.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    attempts: u32,
    last_attempt: Option<DateTime<Local>>,
    max_attempts: u32,
    reset_after: Duration,
}

impl RetryBudget {
    pub fn new(max_attempts: u32, reset_after: Duration) -> Self {
        Self {
            attempts: 0,
            last_attempt: None,
            max_attempts,
            reset_after,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn last_attempt(&self) -> Option<DateTime<Local>> {
        self.last_attempt
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Zero the counter if the quiet period has passed since the last
    /// attempt. Returns true when a reset happened.
    pub fn reset_if_quiet(&mut self, now: DateTime<Local>) -> bool {
        if self.attempts == 0 {
            return false;
        }
        let Some(last) = self.last_attempt else {
            return false;
        };

        let quiet = match chrono::Duration::from_std(self.reset_after) {
            Ok(reset_after) => now.signed_duration_since(last) > reset_after,
            // Unrepresentable reset window, never elapses
            Err(_) => false,
        };

        if quiet {
            self.attempts = 0;
        }
        quiet
    }

    /// Record an attempt at `now`. Returns the attempt number, or `None`
    /// when the budget is spent.
    pub fn try_consume(&mut self, now: DateTime<Local>) -> Option<u32> {
        self.reset_if_quiet(now);
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        self.last_attempt = Some(now);
        Some(self.attempts)
    }
}
