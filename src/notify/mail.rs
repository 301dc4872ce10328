//! Mail transport through a sendmail compatible command.
//!
//! The message is written to the command's stdin as an RFC 822 document
//! with `multipart/alternative` text and HTML bodies. Report images travel
//! as base64 parts of an enclosing `multipart/related` so the HTML can
//! reference them by `cid:`. Exit statuses follow
//! sysexits: `EX_TEMPFAIL` is retried and `EX_NOPERM` is an authentication
//! failure.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Local;
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::debug;
use wait_timeout::ChildExt;

use super::{hostname, subject_line, Notifier, NotifyError};
use crate::report::{Attachment, Report};

const TRANSPORT: &str = "mail";
const EX_TEMPFAIL: i32 = 75;
const EX_NOPERM: i32 = 77;
const SEND_TIMEOUT: Duration = Duration::from_secs(60);
const BASE64_LINE: usize = 76;

pub struct MailCommandNotifier {
    command: String,
    from: String,
    to: String,
    subject_prefix: String,
    host: String,
    timeout: Duration,
}

impl MailCommandNotifier {
    pub fn new(command: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            from: from.into(),
            to: to.into(),
            subject_prefix: String::new(),
            host: hostname(),
            timeout: SEND_TIMEOUT,
        }
    }

    pub fn with_subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subject_prefix = prefix.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Render `report` as a complete mail message.
    pub fn message(&self, report: &Report) -> Result<String, NotifyError> {
        let subject = subject_line(&self.subject_prefix, report);
        for (field, value) in [("From", &self.from), ("To", &self.to), ("Subject", &subject)] {
            if value.contains(['\r', '\n']) {
                return Err(NotifyError::Build(format!("{field} header contains a line break")));
            }
        }

        let stamp = report.generated_at().timestamp_micros();
        let alternative = format!("babysitter-alt-{stamp}");
        let related = format!("babysitter-rel-{stamp}");

        let mut msg = String::new();
        msg.push_str(&format!("From: {} <{}>\r\n", self.host, self.from));
        msg.push_str(&format!("To: {}\r\n", self.to));
        msg.push_str(&format!("Subject: {subject}\r\n"));
        msg.push_str(&format!("Date: {}\r\n", Local::now().to_rfc2822()));
        msg.push_str("MIME-Version: 1.0\r\n");

        if report.attachments().is_empty() {
            push_alternative(&mut msg, &alternative, report);
            return Ok(msg);
        }

        msg.push_str(&format!(
            "Content-Type: multipart/related; boundary=\"{related}\"\r\n\r\n"
        ));
        msg.push_str(&format!("--{related}\r\n"));
        push_alternative(&mut msg, &alternative, report);
        for attachment in report.attachments() {
            msg.push_str(&format!("--{related}\r\n"));
            push_inline(&mut msg, attachment);
        }
        msg.push_str(&format!("--{related}--\r\n"));

        Ok(msg)
    }
}

/// Content-Type header and body of the text and HTML alternatives.
fn push_alternative(msg: &mut String, boundary: &str, report: &Report) {
    msg.push_str(&format!(
        "Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n\r\n"
    ));
    let parts = [("text/plain", report.to_text()), ("text/html", report.to_html())];
    for (content_type, body) in parts {
        msg.push_str(&format!("--{boundary}\r\n"));
        msg.push_str(&format!("Content-Type: {content_type}; charset=utf-8\r\n"));
        msg.push_str("Content-Transfer-Encoding: 8bit\r\n\r\n");
        msg.push_str(&body.replace("\r\n", "\n").replace('\n', "\r\n"));
        msg.push_str("\r\n");
    }
    msg.push_str(&format!("--{boundary}--\r\n"));
}

/// An image part addressable as `cid:<name>`.
fn push_inline(msg: &mut String, attachment: &Attachment) {
    let name = attachment.name.replace(['"', '\r', '\n'], "_");
    msg.push_str(&format!("Content-Type: {}\r\n", attachment.content_type));
    msg.push_str("Content-Transfer-Encoding: base64\r\n");
    msg.push_str(&format!("Content-ID: <{name}>\r\n"));
    msg.push_str(&format!("Content-Disposition: inline; filename=\"{name}\"\r\n\r\n"));

    let encoded = STANDARD.encode(&attachment.data);
    for line in encoded.as_bytes().chunks(BASE64_LINE) {
        msg.push_str(&String::from_utf8_lossy(line));
        msg.push_str("\r\n");
    }
}

impl Notifier for MailCommandNotifier {
    fn name(&self) -> &str {
        TRANSPORT
    }

    fn send(&self, report: &Report) -> Result<(), NotifyError> {
        let message = self.message(report)?;
        debug!(command = %self.command, bytes = message.len(), "piping message to mail command");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| NotifyError::Rejected {
                transport: TRANSPORT,
                message: format!("failed to start '{}': {e}", self.command),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(message.as_bytes()) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(NotifyError::Transient {
                    transport: TRANSPORT,
                    message: format!("failed to write message: {e}"),
                });
            }
        }

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(NotifyError::Transient {
                    transport: TRANSPORT,
                    message: format!("'{}' timed out", self.command),
                });
            }
            Err(e) => {
                return Err(NotifyError::Transient {
                    transport: TRANSPORT,
                    message: e.to_string(),
                })
            }
        };

        match status.code() {
            Some(0) => Ok(()),
            Some(EX_NOPERM) => Err(NotifyError::Auth {
                transport: TRANSPORT,
                message: format!("'{}' exited with EX_NOPERM", self.command),
            }),
            Some(EX_TEMPFAIL) | None => Err(NotifyError::Transient {
                transport: TRANSPORT,
                message: format!("'{}' exited with {status}", self.command),
            }),
            Some(code) => Err(NotifyError::Rejected {
                transport: TRANSPORT,
                message: format!("'{}' exited with code {code}", self.command),
            }),
        }
    }
}
