//! HTTP webhook transport.
//!
//! Posts a JSON payload describing the report. Reports with attachments are
//! sent as `multipart/form-data` with the JSON in a `payload` field and one
//! file part per attachment.

use reqwest::blocking::{multipart, Client};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;

use super::{hostname, subject_line, Notifier, NotifyError};
use crate::report::Report;

const TRANSPORT: &str = "webhook";
const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct Payload<'a> {
    subject: String,
    kind: String,
    host: &'a str,
    unixtime: i64,
    text: String,
    html: String,
    attachments: Vec<&'a str>,
}

pub struct WebhookNotifier {
    url: String,
    subject_prefix: String,
    host: String,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("babysitter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NotifyError::Build(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            subject_prefix: String::new(),
            host: hostname(),
            client,
        })
    }

    pub fn with_subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subject_prefix = prefix.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn payload<'a>(&'a self, report: &'a Report) -> Payload<'a> {
        Payload {
            subject: subject_line(&self.subject_prefix, report),
            kind: report.kind().to_string(),
            host: &self.host,
            unixtime: report.generated_at().timestamp(),
            text: report.to_text(),
            html: report.to_html(),
            attachments: report.attachments().iter().map(|a| a.name.as_str()).collect(),
        }
    }

    fn multipart_form(&self, report: &Report) -> Result<multipart::Form, NotifyError> {
        let json = serde_json::to_string(&self.payload(report))
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        let mut form = multipart::Form::new().text("payload", json);
        for attachment in report.attachments() {
            let part = multipart::Part::bytes(attachment.data.clone())
                .file_name(attachment.name.clone())
                .mime_str(&attachment.content_type)
                .map_err(|e| NotifyError::Build(format!("{}: {e}", attachment.name)))?;
            form = form.part(attachment.name.clone(), part);
        }
        Ok(form)
    }
}

impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        TRANSPORT
    }

    fn send(&self, report: &Report) -> Result<(), NotifyError> {
        let request = self.client.post(&self.url);
        let request = if report.attachments().is_empty() {
            request.json(&self.payload(report))
        } else {
            request.multipart(self.multipart_form(report)?)
        };

        let response = request.send().map_err(|e| NotifyError::Transient {
            transport: TRANSPORT,
            message: e.to_string(),
        })?;

        classify_status(response.status())
    }
}

/// Map an HTTP status to a delivery result.
fn classify_status(status: StatusCode) -> Result<(), NotifyError> {
    if status.is_success() {
        return Ok(());
    }

    let message = format!(
        "HTTP {} - {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown error")
    );

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Err(NotifyError::Auth {
            transport: TRANSPORT,
            message,
        })
    } else if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        Err(NotifyError::Transient {
            transport: TRANSPORT,
            message,
        })
    } else {
        Err(NotifyError::Rejected {
            transport: TRANSPORT,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Attachment, ReportKind};
    use chrono::Local;

    #[test]
    fn test_classify_status() {
        assert!(classify_status(StatusCode::OK).is_ok());
        assert!(classify_status(StatusCode::NO_CONTENT).is_ok());
        assert!(classify_status(StatusCode::UNAUTHORIZED).unwrap_err().is_auth());
        assert!(classify_status(StatusCode::FORBIDDEN).unwrap_err().is_auth());
        assert!(classify_status(StatusCode::BAD_GATEWAY).unwrap_err().is_retryable());
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS).unwrap_err().is_retryable());

        let err = classify_status(StatusCode::BAD_REQUEST).unwrap_err();
        assert!(!err.is_retryable() && !err.is_auth());
        assert_eq!(err.to_string(), "webhook rejected the report: HTTP 400 - Bad Request");
    }

    #[test]
    fn test_payload() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/hook")
            .unwrap()
            .with_subject_prefix("[lab]");
        let mut report = Report::new(ReportKind::Heartbeat, Local::now());
        report.paragraph("all good");
        report.attach(Attachment::new("day.png", vec![1, 2, 3]));

        let payload = notifier.payload(&report);
        assert_eq!(payload.subject, "[lab] Babysitter heartbeat");
        assert_eq!(payload.kind, "heartbeat");
        assert_eq!(payload.text, "all good\n");
        assert_eq!(payload.attachments, vec!["day.png"]);
        assert!(notifier.multipart_form(&report).is_ok());
    }

    #[test]
    fn test_unreachable_endpoint_is_transient() {
        // Port 9 (discard) is not listening on loopback in test environments.
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/hook").unwrap();
        let report = Report::new(ReportKind::Running, Local::now());
        let err = notifier.send(&report).unwrap_err();
        assert!(err.is_retryable());
    }
}
