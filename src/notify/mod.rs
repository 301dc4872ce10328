//! Report delivery
//!
//! The supervisor hands finished reports to a [`Notifier`]. Delivery is
//! best effort: transient failures are retried a bounded number of times
//! with a fixed delay and then dropped, authentication failures are fatal.

mod log;
mod mail;
mod webhook;

pub use self::log::LogNotifier;
pub use mail::MailCommandNotifier;
pub use webhook::WebhookNotifier;

use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::constants::{SEND_ATTEMPTS, SEND_RETRY_DELAY};
use crate::report::Report;
use crate::supervisor::CancelToken;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// Credentials were refused. Never retried.
    #[error("{transport} authentication failed: {message}")]
    Auth {
        transport: &'static str,
        message: String,
    },

    /// Connection trouble or a temporary server error. Worth retrying.
    #[error("{transport} temporarily unavailable: {message}")]
    Transient {
        transport: &'static str,
        message: String,
    },

    /// The transport refused this particular report.
    #[error("{transport} rejected the report: {message}")]
    Rejected {
        transport: &'static str,
        message: String,
    },

    #[error("failed to build message: {0}")]
    Build(String),
}

impl NotifyError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, NotifyError::Transient { .. })
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, NotifyError::Auth { .. })
    }
}

/// Transport for finished reports.
pub trait Notifier {
    /// Short transport name for logs.
    fn name(&self) -> &str;

    /// One delivery attempt.
    fn send(&self, report: &Report) -> Result<(), NotifyError>;
}

/// Retry settings for [`deliver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    pub attempts: u32,
    pub retry_delay: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            attempts: SEND_ATTEMPTS,
            retry_delay: SEND_RETRY_DELAY,
        }
    }
}

/// How a delivery ended when it did not fail fatally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent { attempt: u32 },
    /// Dropped after the retry budget or a non-retryable rejection.
    GaveUp { attempts: u32, error: String },
    /// Interrupted while waiting to retry.
    Cancelled,
}

impl Delivery {
    pub fn is_sent(&self) -> bool {
        matches!(self, Delivery::Sent { .. })
    }
}

/// Send `report`, retrying transient failures.
///
/// Only authentication failures are returned as errors.
pub fn deliver(
    notifier: &dyn Notifier,
    report: &Report,
    policy: &DeliveryPolicy,
    cancel: &CancelToken,
) -> Result<Delivery, NotifyError> {
    let attempts = policy.attempts.max(1);
    let kind = report.kind();

    for attempt in 1..=attempts {
        match notifier.send(report) {
            Ok(()) => {
                info!(notifier = notifier.name(), %kind, attempt, "report sent");
                return Ok(Delivery::Sent { attempt });
            }
            Err(e) if e.is_auth() => {
                error!(
                    notifier = notifier.name(),
                    %kind,
                    error = %e,
                    "authentication failed, check notifier credentials"
                );
                return Err(e);
            }
            Err(e) if e.is_retryable() && attempt < attempts => {
                warn!(
                    notifier = notifier.name(),
                    %kind,
                    attempt,
                    attempts,
                    error = %e,
                    "send failed, retrying"
                );
                if !cancel.sleep(policy.retry_delay) {
                    return Ok(Delivery::Cancelled);
                }
            }
            Err(e) => {
                error!(
                    notifier = notifier.name(),
                    %kind,
                    attempt,
                    error = %e,
                    "giving up on report"
                );
                return Ok(Delivery::GaveUp {
                    attempts: attempt,
                    error: e.to_string(),
                });
            }
        }
    }

    // The loop always returns on its last attempt.
    Ok(Delivery::GaveUp {
        attempts,
        error: "no attempts made".to_string(),
    })
}

/// `<prefix> <subject>`, or just the subject without a prefix.
pub fn subject_line(prefix: &str, report: &Report) -> String {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        report.subject().to_string()
    } else {
        format!("{prefix} {}", report.subject())
    }
}

pub(crate) fn hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}
