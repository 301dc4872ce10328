//! Files expected to keep being rewritten.

use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use crate::models::CheckState;

use super::format_span;

/// FAIL when the file has not been modified for `timeout`.
///
/// A missing file counts as modified at the Unix epoch, so it stays FAIL
/// until it is created.
#[derive(Debug, Clone)]
pub struct FileFreshness {
    path: PathBuf,
    timeout: Duration,
    label: Option<String>,
    failing_since: Option<DateTime<Local>>,
    /// Set only by the evaluation that observed a FAIL→OK transition.
    recovered_after: Option<chrono::Duration>,
}

impl FileFreshness {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration, label: Option<String>) -> Self {
        Self {
            path: path.into(),
            timeout,
            label: label.filter(|l| !l.is_empty()),
            failing_since: None,
            recovered_after: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// How long the file had been dead, right after it came back.
    pub fn recovered_after(&self) -> Option<chrono::Duration> {
        self.recovered_after
    }

    pub fn evaluate(&mut self, now: DateTime<Local>) -> CheckState {
        let age = seconds_since_modified(&self.path, now);
        let state = CheckState::from_healthy(age < self.timeout.as_secs_f64());

        match state {
            CheckState::Fail => {
                self.failing_since.get_or_insert(now);
                self.recovered_after = None;
            }
            CheckState::Ok => {
                self.recovered_after = self.failing_since.take().map(|since| now - since);
            }
        }

        state
    }

    pub(super) fn extra_text(&self, now: DateTime<Local>) -> String {
        let mut msg = String::new();
        if let Some(label) = &self.label {
            msg.push_str(&format!(", {label}"));
        }

        if self.path.exists() {
            msg.push_str(&format!(
                ", last modified {:.1}s ago.",
                seconds_since_modified(&self.path, now)
            ));
        } else {
            msg.push_str(", does not exist!");
        }

        if let Some(dead) = self.recovered_after {
            let secs = dead.num_milliseconds() as f64 / 1000.0;
            msg.push_str(&format!(" Was dead for {}.", format_span(secs)));
        }

        msg
    }
}

/// Age of the file's modification time; missing files are as old as the epoch.
pub fn seconds_since_modified(path: &Path, now: DateTime<Local>) -> f64 {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(UNIX_EPOCH);
    let modified: DateTime<Local> = modified.into();
    (now - modified).num_milliseconds() as f64 / 1000.0
}
