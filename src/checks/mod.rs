//! Resource checks
//!
//! A check observes one resource and produces OK or FAIL. The variant set
//! is fixed, so checks are a closed enum dispatched by `match`.
//!
//! Checks never fail: any inspection error is reported as FAIL.

mod disk;
mod file;
mod growth;
pub mod inspect;
mod process;

pub use disk::{decay_rate, seconds_until_full, DiskSpace};
pub use file::{seconds_since_modified, FileFreshness};
pub use growth::FileGrowth;
pub use inspect::{Inspector, SystemInspector};
pub use process::ProcessCheck;

use chrono::{DateTime, Local};

use crate::models::constants::DISK_SPACE_NAME;
use crate::models::{CheckKind, CheckState};

/// One unit of observation.
#[derive(Debug, Clone)]
pub enum Check {
    DiskSpace(DiskSpace),
    Process(ProcessCheck),
    FileFreshness(FileFreshness),
    FileGrowth(FileGrowth),
}

impl Check {
    /// Full name: the path for file checks, the process name for processes.
    pub fn name(&self) -> String {
        match self {
            Check::DiskSpace(_) => DISK_SPACE_NAME.to_string(),
            Check::Process(p) => p.name().to_string(),
            Check::FileFreshness(f) => f.path().display().to_string(),
            Check::FileGrowth(g) => g.path().display().to_string(),
        }
    }

    /// Name with any leading directories removed.
    pub fn display_name(&self) -> String {
        let name = self.name();
        match name.rsplit_once('/') {
            Some((_, base)) => base.to_string(),
            None => name,
        }
    }

    pub fn kind(&self) -> CheckKind {
        match self {
            Check::DiskSpace(_) => CheckKind::DiskSpace,
            Check::Process(_) => CheckKind::Process,
            Check::FileFreshness(_) => CheckKind::FileFreshness,
            Check::FileGrowth(_) => CheckKind::FileGrowth,
        }
    }

    /// Inspect the live resource. Never cached across calls.
    pub fn evaluate(&mut self, inspector: &dyn Inspector, now: DateTime<Local>) -> CheckState {
        match self {
            Check::DiskSpace(d) => d.evaluate(inspector),
            Check::Process(p) => p.evaluate(inspector, now),
            Check::FileFreshness(f) => f.evaluate(now),
            Check::FileGrowth(g) => g.evaluate(),
        }
    }

    /// `name=STATE` followed by variant specific details.
    ///
    /// Takes the state rather than evaluating, since evaluating a
    /// FileGrowth check consumes its change.
    pub fn describe(
        &self,
        state: CheckState,
        inspector: &dyn Inspector,
        now: DateTime<Local>,
    ) -> String {
        let extra = match self {
            Check::DiskSpace(d) => d.extra_text(inspector, now),
            Check::Process(p) => p.extra_text(inspector),
            Check::FileFreshness(f) => f.extra_text(now),
            Check::FileGrowth(g) => g.extra_text(),
        };
        format!("{}={}{}", self.display_name(), state, extra)
    }

    pub fn as_process_mut(&mut self) -> Option<&mut ProcessCheck> {
        match self {
            Check::Process(p) => Some(p),
            _ => None,
        }
    }
}

impl From<DiskSpace> for Check {
    fn from(check: DiskSpace) -> Self {
        Check::DiskSpace(check)
    }
}

impl From<ProcessCheck> for Check {
    fn from(check: ProcessCheck) -> Self {
        Check::Process(check)
    }
}

impl From<FileFreshness> for Check {
    fn from(check: FileFreshness) -> Self {
        Check::FileFreshness(check)
    }
}

impl From<FileGrowth> for Check {
    fn from(check: FileGrowth) -> Self {
        Check::FileGrowth(check)
    }
}

/// Format seconds as `<d>days <h>hrs <m>mins`.
pub fn format_span(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let mins = (total % 3600) / 60;
    format!("{days}days {hours}hrs {mins}mins")
}
