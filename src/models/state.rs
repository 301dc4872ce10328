use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary state produced by every resource check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckState {
    Ok,
    Fail,
}

impl CheckState {
    pub fn is_ok(self) -> bool {
        self == CheckState::Ok
    }

    pub fn is_fail(self) -> bool {
        self == CheckState::Fail
    }

    /// OK when `healthy` holds, FAIL otherwise.
    pub fn from_healthy(healthy: bool) -> Self {
        if healthy {
            CheckState::Ok
        } else {
            CheckState::Fail
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CheckState::Ok => "OK",
            CheckState::Fail => "FAIL",
        }
    }
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which variant a check is, for logging and config summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    DiskSpace,
    Process,
    FileFreshness,
    FileGrowth,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckKind::DiskSpace => write!(f, "disk-space"),
            CheckKind::Process => write!(f, "process"),
            CheckKind::FileFreshness => write!(f, "file"),
            CheckKind::FileGrowth => write!(f, "file-growth"),
        }
    }
}
