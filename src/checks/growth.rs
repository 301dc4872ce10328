//! Files that must not grow, such as error logs.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::CheckState;

/// FAIL on every evaluation that sees the size change, OK otherwise.
///
/// Growth of the file is itself the alert condition, so a quiet error log
/// is healthy and a single new line flips the check to FAIL for one tick.
#[derive(Debug, Clone)]
pub struct FileGrowth {
    path: PathBuf,
    last_size: u64,
}

impl FileGrowth {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_size = file_size(&path);
        Self { path, last_size }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_size(&self) -> u64 {
        self.last_size
    }

    pub fn evaluate(&mut self) -> CheckState {
        let size = file_size(&self.path);
        if size == self.last_size {
            CheckState::Ok
        } else {
            self.last_size = size;
            CheckState::Fail
        }
    }

    pub(super) fn extra_text(&self) -> String {
        format!(", size {} bytes.", file_size(&self.path))
    }
}

/// Size in bytes; a missing or unreadable file has size 0.
fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
