//! Diagnostic commands whose results are folded into reports.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::runner::CommandRunner;

use super::Block;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticCommand {
    pub command: String,
    /// Include stdout even when the command succeeds.
    #[serde(default)]
    pub always_include_stdout: bool,
}

impl DiagnosticCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            always_include_stdout: false,
        }
    }

    pub fn with_stdout(mut self) -> Self {
        self.always_include_stdout = true;
        self
    }
}

/// Run `diagnostic` and describe the result as report blocks.
///
/// Failures never propagate: a command that cannot be started or exits
/// non-zero is reported in the returned blocks.
pub fn diagnostic_blocks(diagnostic: &DiagnosticCommand, runner: &dyn CommandRunner) -> Vec<Block> {
    let command = diagnostic.command.as_str();
    info!(command, "running diagnostic command");

    let output = match runner.run(command) {
        Ok(output) => output,
        Err(e) => {
            warn!(command, error = %e, "failed to start diagnostic command");
            return vec![Block::Alert(format!("Failed to run {command}: {e:#}"))];
        }
    };

    let mut blocks = Vec::new();
    if output.success {
        info!(
            command,
            duration_ms = output.duration.as_millis() as u64,
            "diagnostic command succeeded"
        );
        blocks.push(Block::Paragraph(format!("Successfully ran {command}")));
    } else {
        let reason = if output.timed_out {
            format!("Failed to run {command} (timed out after {}s)", output.duration.as_secs())
        } else {
            match output.exit_code {
                Some(code) => format!("Failed to run {command} (exit code {code})"),
                None => format!("Failed to run {command}"),
            }
        };
        warn!(command, stderr = %output.stderr.trim(), "{reason}");
        blocks.push(Block::Alert(reason));
        if !output.stderr.trim().is_empty() {
            blocks.push(Block::Paragraph("stderr:".to_string()));
            blocks.push(Block::Preformatted(output.stderr.clone()));
        }
    }

    if (diagnostic.always_include_stdout || !output.success) && !output.stdout.trim().is_empty() {
        blocks.push(Block::Preformatted(output.stdout));
    }

    blocks
}
