//! Daily heartbeat scheduling.
//!
//! The heartbeat is a full status report sent once a day at a fixed hour,
//! whether or not anything is failing. Scheduling compares hours of the
//! day rather than running a timer: the report fires on the first tick
//! that falls in the target hour. If the process is not running during
//! that hour the heartbeat for the day is skipped.

use std::path::{Path, PathBuf};

use crate::report::DiagnosticCommand;

#[derive(Debug, Clone, Default)]
pub struct HeartbeatSchedule {
    /// Hour of day (0-23) to send the heartbeat; `None` disables it.
    hour: Option<u32>,
    /// Commands whose result is included in every heartbeat.
    commands: Vec<DiagnosticCommand>,
    /// Static HTML report relayed with the heartbeat.
    report_file: Option<PathBuf>,
    last_checked_hour: Option<u32>,
}

impl HeartbeatSchedule {
    pub fn new(hour: Option<u32>) -> Self {
        Self {
            hour: hour.filter(|h| *h < 24),
            ..Default::default()
        }
    }

    pub fn with_commands(mut self, commands: Vec<DiagnosticCommand>) -> Self {
        self.commands = commands;
        self
    }

    pub fn with_report_file(mut self, report_file: Option<PathBuf>) -> Self {
        self.report_file = report_file;
        self
    }

    pub fn hour(&self) -> Option<u32> {
        self.hour
    }

    pub fn commands(&self) -> &[DiagnosticCommand] {
        &self.commands
    }

    pub fn report_file(&self) -> Option<&Path> {
        self.report_file.as_deref()
    }

    pub fn last_checked_hour(&self) -> Option<u32> {
        self.last_checked_hour
    }

    /// Remember `hour` as seen without deciding anything. Used at startup
    /// so the initial heartbeat is not followed by a scheduled one.
    pub fn mark_checked(&mut self, hour: u32) {
        self.last_checked_hour = Some(hour);
    }

    /// True on the first call in the target hour. Always records `now_hour`.
    pub fn due(&mut self, now_hour: u32) -> bool {
        let due = self.hour == Some(now_hour) && self.last_checked_hour != Some(now_hour);
        self.last_checked_hour = Some(now_hour);
        due
    }
}
