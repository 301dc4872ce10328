//! Report Builder
//!
//! A report is an ordered list of blocks plus optional inline attachments.
//! It knows nothing about transport: notifiers render it to plain text or
//! HTML as they need.

mod diagnostic;
mod relay;

pub use diagnostic::{diagnostic_blocks, DiagnosticCommand};
pub use relay::{extract_images, relay_html_file};

use chrono::{DateTime, Local};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::models::constants::subjects;

/// Why a report is being sent. Determines the subject line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// Initial heartbeat sent at startup.
    Running,
    Heartbeat,
    StateChange,
    Shutdown,
    NewDirectory,
}

impl ReportKind {
    pub fn subject(&self) -> &'static str {
        match self {
            ReportKind::Running => subjects::RUNNING,
            ReportKind::Heartbeat => subjects::HEARTBEAT,
            ReportKind::StateChange => subjects::STATE_CHANGE,
            ReportKind::Shutdown => subjects::SHUTDOWN,
            ReportKind::NewDirectory => subjects::NEW_DIRECTORY,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReportKind::Running => "running",
            ReportKind::Heartbeat => "heartbeat",
            ReportKind::StateChange => "state-change",
            ReportKind::Shutdown => "shutdown",
            ReportKind::NewDirectory => "new-directory",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(String),
    Paragraph(String),
    /// Highlighted paragraph for failures.
    Alert(String),
    List(Vec<String>),
    /// Command output, kept verbatim.
    Preformatted(String),
}

/// Binary file shipped with a report and referenced as `cid:<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = content_type_for(&name).to_string();
        Self {
            name,
            content_type,
            data,
        }
    }
}

fn content_type_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "html" | "htm" => "text/html",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    kind: ReportKind,
    generated_at: DateTime<Local>,
    blocks: Vec<Block>,
    /// Full HTML document relayed verbatim; blocks are inserted into its body.
    relayed_html: Option<String>,
    attachments: Vec<Attachment>,
}

impl Report {
    pub fn new(kind: ReportKind, generated_at: DateTime<Local>) -> Self {
        Self {
            kind,
            generated_at,
            blocks: Vec::new(),
            relayed_html: None,
            attachments: Vec::new(),
        }
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn subject(&self) -> &'static str {
        self.kind.subject()
    }

    pub fn generated_at(&self) -> DateTime<Local> {
        self.generated_at
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn relayed_html(&self) -> Option<&str> {
        self.relayed_html.as_deref()
    }

    pub fn push(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }

    pub fn extend(&mut self, blocks: impl IntoIterator<Item = Block>) -> &mut Self {
        self.blocks.extend(blocks);
        self
    }

    pub fn heading(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Block::Heading(text.into()))
    }

    pub fn paragraph(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Block::Paragraph(text.into()))
    }

    pub fn alert(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Block::Alert(text.into()))
    }

    pub fn list(&mut self, items: Vec<String>) -> &mut Self {
        self.push(Block::List(items))
    }

    /// `Unixtime = <t>` footer.
    pub fn timestamp(&mut self) -> &mut Self {
        let t = self.generated_at.timestamp();
        self.paragraph(format!("Unixtime = {t}"))
    }

    pub fn attach(&mut self, attachment: Attachment) -> &mut Self {
        self.attachments.push(attachment);
        self
    }

    pub fn set_relayed_html(&mut self, html: String) {
        self.relayed_html = Some(html);
    }

    /// Plain text rendering, used for logs and text-only transports.
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        for block in &self.blocks {
            match block {
                Block::Heading(text) | Block::Paragraph(text) | Block::Alert(text) => {
                    out.push_str(text);
                    out.push('\n');
                }
                Block::List(items) => {
                    for item in items {
                        out.push_str("* ");
                        out.push_str(item);
                        out.push('\n');
                    }
                }
                Block::Preformatted(text) => {
                    out.push_str(text.trim_end());
                    out.push('\n');
                }
            }
        }

        if let Some(html) = &self.relayed_html {
            out.push_str(&html_to_text(html));
        }

        out
    }

    pub fn to_html(&self) -> String {
        let mut body = String::new();
        for block in &self.blocks {
            match block {
                Block::Heading(text) => {
                    body.push_str(&format!("<h2>{}</h2>\n", escape_html(text)));
                }
                Block::Paragraph(text) => {
                    body.push_str(&format!("<p>{}</p>\n", escape_html(text)));
                }
                Block::Alert(text) => {
                    body.push_str(&format!(
                        "<p><span style=\"color:red\">{}</span></p>\n",
                        escape_html(text)
                    ));
                }
                Block::List(items) => {
                    body.push_str("<ul>\n");
                    for item in items {
                        body.push_str(&format!("  <li>{}</li>\n", escape_html(item)));
                    }
                    body.push_str("</ul>\n");
                }
                Block::Preformatted(text) => {
                    body.push_str(&format!("<pre>{}</pre>\n", escape_html(text)));
                }
            }
        }

        match &self.relayed_html {
            Some(html) => insert_into_body(html, &body),
            None => format!("<html>\n<head></head>\n<body>\n{body}</body>\n</html>\n"),
        }
    }
}

static BODY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<body[^>]*>").expect("Invalid regex pattern"));

static LINE_BREAKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</(p|li|tr|h[1-6]|div|title)>|<br\s*/?>").expect("Invalid regex pattern")
});

static TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid regex pattern"));

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("Invalid regex pattern"));

fn insert_into_body(document: &str, fragment: &str) -> String {
    match BODY_TAG.find(document) {
        Some(m) => format!(
            "{}\n{}{}",
            &document[..m.end()],
            fragment,
            &document[m.end()..]
        ),
        None => format!("{fragment}{document}"),
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Crude HTML to text conversion for relayed documents.
pub fn html_to_text(html: &str) -> String {
    let text = LINE_BREAKS.replace_all(html, "\n");
    let text = TAGS.replace_all(&text, "");
    let text = BLANK_LINES.replace_all(&text, "\n");
    let text = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");

    let mut out: String = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}
