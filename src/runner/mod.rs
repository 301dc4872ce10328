//! External command execution
//!
//! Used for two things: spawning restart commands for dead processes
//! (fire and forget) and running diagnostic commands whose output ends
//! up in reports.

mod shell;

pub use shell::ShellRunner;

use anyhow::Result;
use std::time::Duration;

/// Captured result of a command run to completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub command: String,
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn new(command: &str, success: bool, stdout: String, stderr: String) -> Self {
        Self {
            command: command.to_string(),
            success,
            exit_code: if success { Some(0) } else { None },
            stdout,
            stderr,
            timed_out: false,
            duration: Duration::ZERO,
        }
    }
}

/// What happened right after a detached command was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnOutcome {
    /// Still running after the grace window.
    Running { pid: u32 },
    /// Already gone within the grace window.
    Exited { success: bool, stderr: String },
}

impl SpawnOutcome {
    /// A spawn counts as failed only when the child died with an error.
    pub fn is_failure(&self) -> bool {
        matches!(self, SpawnOutcome::Exited { success: false, .. })
    }
}

/// Runs operating system commands for the supervisor.
pub trait CommandRunner {
    /// Run `command` through the shell and wait for it, capturing output.
    fn run(&self, command: &str) -> Result<CommandOutput>;

    /// Start `command` detached and report whether it died immediately.
    fn spawn(&self, command: &str) -> Result<SpawnOutcome>;
}
