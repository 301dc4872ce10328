//! Numbered data directories
//!
//! The monitored logger writes into `<base>/<n>/`, starting a new numbered
//! directory whenever it is reinitialised. The supervisor binds its file
//! checks to the latest one and treats the appearance of a newer directory
//! as the end of the session.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::supervisor::CancelToken;

/// One line of `labels.dat`: a channel number and its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLabel {
    pub channel: u32,
    pub label: String,
}

impl ChannelLabel {
    /// The data file this channel is written to inside `dir`.
    pub fn data_file(&self, dir: &Path) -> PathBuf {
        dir.join(format!("channel_{}.dat", self.channel))
    }
}

/// Greatest all-digit subdirectory name of `base`, compared numerically.
pub fn latest_numeric_subdir(base: &Path) -> io::Result<Option<String>> {
    let mut latest: Option<(u128, String)> = None;

    for entry in fs::read_dir(base)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(number) = name.parse::<u128>() else {
            continue;
        };

        let newer = match &latest {
            None => true,
            // Equal values ("7" vs "007") fall back to the string order
            Some((best, best_name)) => (number, &name) > (*best, best_name),
        };
        if newer {
            latest = Some((number, name));
        }
    }

    Ok(latest.map(|(_, name)| name))
}

/// Resolve the directory the session binds to. Returns the directory and
/// the selected numbered subdirectory, if any.
pub fn resolve_data_dir(
    base: &Path,
    numeric_subdirs: bool,
) -> Result<(PathBuf, Option<String>), ConfigError> {
    let base = fs::canonicalize(base).map_err(|source| ConfigError::DataDir {
        path: base.to_path_buf(),
        source,
    })?;

    if !numeric_subdirs {
        return Ok((base, None));
    }

    let latest = latest_numeric_subdir(&base).map_err(|source| ConfigError::DataDir {
        path: base.clone(),
        source,
    })?;

    let dir = match &latest {
        Some(sub) => base.join(sub),
        None => base,
    };
    info!(data_dir = %dir.display(), "data directory selected");
    Ok((dir, latest))
}

/// Parse `labels.dat` content: `<channel> <label>` per non-empty line.
pub fn parse_labels(content: &str, path: &Path) -> Result<Vec<ChannelLabel>, ConfigError> {
    let mut labels = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let mut parts = line.split_whitespace();
        let Some(channel) = parts.next() else {
            continue;
        };

        let invalid = |reason: &str| ConfigError::Labels {
            path: path.to_path_buf(),
            line: index + 1,
            reason: reason.to_string(),
        };

        let channel = channel
            .parse::<u32>()
            .map_err(|_| invalid("channel is not a number"))?;
        let label = parts.next().ok_or_else(|| invalid("missing label"))?;

        labels.push(ChannelLabel {
            channel,
            label: label.to_string(),
        });
    }

    Ok(labels)
}

/// Read the labels file, waiting for it to appear.
///
/// The logger writes `labels.dat` while it starts up, so a missing file is
/// retried `attempts` times with `wait` between attempts.
pub fn wait_for_labels(
    path: &Path,
    attempts: u32,
    wait: Duration,
    cancel: &CancelToken,
) -> Result<Vec<ChannelLabel>, ConfigError> {
    let attempts = attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match fs::read_to_string(path) {
            Ok(content) => return parse_labels(&content, path),
            Err(e) if e.kind() == io::ErrorKind::NotFound && attempt < attempts => {
                warn!(
                    path = %path.display(),
                    attempt,
                    attempts,
                    "labels file not there yet, waiting"
                );
                if !cancel.sleep(wait) {
                    return Err(ConfigError::Interrupted);
                }
            }
            Err(source) => {
                return Err(ConfigError::LabelsUnreadable {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
}

/// Watches `base` for a numbered subdirectory newer than the bound one.
#[derive(Debug, Clone)]
pub struct DataDirWatcher {
    base: PathBuf,
    current: Option<String>,
}

impl DataDirWatcher {
    pub fn new(base: impl Into<PathBuf>, current: Option<String>) -> Self {
        Self {
            base: base.into(),
            current,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// The newer subdirectory name, when the latest differs from the bound one.
    pub fn drifted(&self) -> Option<String> {
        match latest_numeric_subdir(&self.base) {
            Ok(Some(latest)) if self.current.as_deref() != Some(latest.as_str()) => Some(latest),
            Ok(_) => None,
            Err(e) => {
                warn!(base = %self.base.display(), error = %e, "failed to list data directory");
                None
            }
        }
    }
}
