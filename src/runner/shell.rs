//! `sh -c` based command runner

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::models::constants::{DIAGNOSTIC_TIMEOUT, SPAWN_GRACE};

use super::{CommandOutput, CommandRunner, SpawnOutcome};

/// Timeout for collecting output from child process pipes
const OUTPUT_COLLECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum output kept per stream for a report (1MB)
const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// Runs commands with the system shell.
///
/// Detached children are kept and reaped on later calls so restarted
/// daemons that exit do not linger as zombies.
pub struct ShellRunner {
    timeout: Duration,
    grace: Duration,
    detached: RefCell<Vec<Child>>,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self {
            timeout: DIAGNOSTIC_TIMEOUT,
            grace: SPAWN_GRACE,
            detached: RefCell::new(Vec::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Number of detached children not yet reaped.
    pub fn detached_count(&self) -> usize {
        self.reap();
        self.detached.borrow().len()
    }

    fn reap(&self) {
        self.detached
            .borrow_mut()
            .retain_mut(|child| matches!(child.try_wait(), Ok(None)));
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> Result<CommandOutput> {
        self.reap();
        let start = Instant::now();

        let mut child = shell(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn command: {command}"))?;

        // Drain both pipes while waiting, otherwise a chatty child blocks
        // on a full pipe buffer and never exits.
        let (stdout_tx, stdout_rx) = mpsc::channel();
        let (stderr_tx, stderr_rx) = mpsc::channel();

        match child.stdout.take() {
            Some(stdout) => {
                thread::spawn(move || {
                    let _ = stdout_tx.send(read_stream_to_string(stdout));
                });
            }
            None => {
                let _ = stdout_tx.send(String::new());
            }
        }
        match child.stderr.take() {
            Some(stderr) => {
                thread::spawn(move || {
                    let _ = stderr_tx.send(read_stream_to_string(stderr));
                });
            }
            None => {
                let _ = stderr_tx.send(String::new());
            }
        }

        let status = child
            .wait_timeout(self.timeout)
            .with_context(|| format!("Failed to wait for command: {command}"))?;

        let timed_out = status.is_none();
        if timed_out {
            let _ = child.kill();
            let _ = child.wait();
        }

        let stdout = stdout_rx
            .recv_timeout(OUTPUT_COLLECTION_TIMEOUT)
            .unwrap_or_else(|_| "[output collection timed out]".to_string());
        let mut stderr = stderr_rx
            .recv_timeout(OUTPUT_COLLECTION_TIMEOUT)
            .unwrap_or_else(|_| "[output collection timed out]".to_string());

        if timed_out {
            stderr.push_str(&format!(
                "\n[Process killed after {}s timeout]",
                self.timeout.as_secs()
            ));
        }

        let output = CommandOutput {
            command: command.to_string(),
            success: status.map(|s| s.success()).unwrap_or(false),
            exit_code: status.and_then(|s| s.code()),
            stdout,
            stderr,
            timed_out,
            duration: start.elapsed(),
        };
        debug!(
            %command,
            success = output.success,
            exit_code = ?output.exit_code,
            "command finished"
        );
        Ok(output)
    }

    fn spawn(&self, command: &str) -> Result<SpawnOutcome> {
        self.reap();

        let mut child = shell(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn command: {command}"))?;

        match child
            .wait_timeout(self.grace)
            .with_context(|| format!("Failed to poll command: {command}"))?
        {
            Some(status) => {
                // A backgrounded grandchild may hold the pipe open, so the
                // read is bounded.
                let stderr = match child.stderr.take() {
                    Some(pipe) if !status.success() => collect_bounded(pipe),
                    Some(pipe) => {
                        discard(pipe);
                        String::new()
                    }
                    None => String::new(),
                };
                if !status.success() {
                    warn!(%command, %status, stderr = %stderr.trim(), "command terminated already");
                }
                Ok(SpawnOutcome::Exited {
                    success: status.success(),
                    stderr,
                })
            }
            None => {
                let pid = child.id();
                if let Some(pipe) = child.stderr.take() {
                    discard(pipe);
                }
                self.detached.borrow_mut().push(child);
                Ok(SpawnOutcome::Running { pid })
            }
        }
    }
}

fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

/// Read `stream` on a helper thread, waiting at most `OUTPUT_COLLECTION_TIMEOUT`.
fn collect_bounded<R: Read + Send + 'static>(stream: R) -> String {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(read_stream_to_string(stream));
    });
    rx.recv_timeout(OUTPUT_COLLECTION_TIMEOUT)
        .unwrap_or_else(|_| "[output collection timed out]".to_string())
}

/// Keep draining a detached child's pipe so it never blocks or gets SIGPIPE.
fn discard<R: Read + Send + 'static>(mut stream: R) {
    thread::spawn(move || {
        let _ = io::copy(&mut stream, &mut io::sink());
    });
}

/// Read a stream to a string, keeping at most `MAX_OUTPUT_SIZE` bytes.
fn read_stream_to_string<R: Read>(stream: R) -> String {
    let mut buf = Vec::new();
    let _ = stream.take(MAX_OUTPUT_SIZE as u64).read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_captures_both_streams() {
        let runner = ShellRunner::new();
        let output = runner.run("echo out; echo err >&2").unwrap();
        assert!(output.success);
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        assert!(!output.timed_out);
    }

    #[test]
    fn test_run_reports_failure_exit_code() {
        let output = ShellRunner::new().run("exit 3").unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
    }

    #[test]
    fn test_run_times_out() {
        let runner = ShellRunner::new().with_timeout(Duration::from_millis(200));
        let output = runner.run("sleep 5").unwrap();
        assert!(output.timed_out);
        assert!(!output.success);
        assert!(output.stderr.contains("killed after"));
    }

    #[test]
    fn test_spawn_detects_immediate_failure() {
        let runner = ShellRunner::new().with_grace(Duration::from_secs(2));
        let outcome = runner.spawn("echo broken >&2; exit 1").unwrap();
        assert!(outcome.is_failure());
        if let SpawnOutcome::Exited { stderr, .. } = outcome {
            assert_eq!(stderr.trim(), "broken");
        }
    }

    #[test]
    fn test_spawn_leaves_long_running_child() {
        let runner = ShellRunner::new().with_grace(Duration::from_millis(100));
        let outcome = runner.spawn("sleep 1").unwrap();
        assert!(matches!(outcome, SpawnOutcome::Running { .. }));
        assert_eq!(runner.detached_count(), 1);

        thread::sleep(Duration::from_millis(1500));
        assert_eq!(runner.detached_count(), 0);
    }
}
