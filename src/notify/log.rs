use tracing::info;

use super::{Notifier, NotifyError};
use crate::report::Report;

/// Writes reports to the log. Used when no transport is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn send(&self, report: &Report) -> Result<(), NotifyError> {
        info!(
            subject = report.subject(),
            attachments = report.attachments().len(),
            "no transport configured, report follows:\n{}",
            report.to_text()
        );
        Ok(())
    }
}
