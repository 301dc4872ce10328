//! Relay of a static HTML report.
//!
//! Images referenced by the document are shipped as inline attachments and
//! their `src` rewritten to `cid:<file name>`.

use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

use super::{Attachment, Report};

static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(<img\b[^>]*?\bsrc\s*=\s*)(["'])([^"']*)(["'])"#)
        .expect("Invalid regex pattern")
});

/// Rewrite `<img src>` references to `cid:` URLs.
///
/// Returns the rewritten document and the referenced files resolved
/// against `base_dir`. Absolute URLs and existing `cid:`/`data:` sources
/// are left alone.
pub fn extract_images(html: &str, base_dir: &Path) -> (String, Vec<PathBuf>) {
    let mut files = Vec::new();

    let rewritten = IMG_SRC.replace_all(html, |caps: &Captures| {
        let src = &caps[3];
        let whole = caps[0].to_string();
        if src.is_empty()
            || src.contains("://")
            || src.starts_with("cid:")
            || src.starts_with("data:")
        {
            return whole;
        }

        let path = base_dir.join(src);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| src.to_string());
        files.push(path);
        format!("{}{}cid:{}{}", &caps[1], &caps[2], name, &caps[4])
    });

    (rewritten.into_owned(), files)
}

/// Append the HTML file at `path` to `report`.
///
/// A file that cannot be read adds a "Failed to open" alert instead and
/// returns false. Images that cannot be read are skipped with a warning.
pub fn relay_html_file(report: &mut Report, path: &Path) -> bool {
    let html = match fs::read_to_string(path) {
        Ok(html) => html,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to open report file");
            report.alert(format!("Failed to open filename {}", path.display()));
            return false;
        }
    };

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let (html, images) = extract_images(&html, base_dir);

    for image in images {
        match fs::read(&image) {
            Ok(data) => {
                let name = image
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                debug!(image = %image.display(), bytes = data.len(), "attaching image");
                report.attach(Attachment::new(name, data));
            }
            Err(e) => warn!(image = %image.display(), error = %e, "can't open image file"),
        }
    }

    report.set_relayed_html(html);
    true
}
