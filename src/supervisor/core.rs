//! The supervisory loop.

use chrono::{DateTime, Local, TimeDelta, Timelike};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::checks::{Check, Inspector};
use crate::models::constants::{RESTART_SETTLE, UPDATE_PERIOD};
use crate::monitor::{DataDirWatcher, HeartbeatSchedule, RestartOutcome, Tracked};
use crate::notify::{deliver, DeliveryPolicy, Notifier, NotifyError};
use crate::report::{diagnostic_blocks, relay_html_file, DiagnosticCommand, Report, ReportKind};
use crate::runner::CommandRunner;

use super::cancel::CancelToken;

/// Loop timing and alert contents.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub poll_interval: Duration,
    /// Wait after spawning a restart before re-checking the process.
    pub restart_settle: Duration,
    /// Diagnostics appended to every state-change alert.
    pub alert_commands: Vec<DiagnosticCommand>,
    pub delivery: DeliveryPolicy,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            poll_interval: UPDATE_PERIOD,
            restart_settle: RESTART_SETTLE,
            alert_commands: Vec::new(),
            delivery: DeliveryPolicy::default(),
        }
    }
}

/// External collaborators the loop talks to.
pub struct Collaborators {
    pub inspector: Box<dyn Inspector>,
    pub runner: Box<dyn CommandRunner>,
    pub notifier: Box<dyn Notifier>,
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// A newer data directory appeared; rebuild the session against it.
    RestartSession { directory: String },
    FatalShutdown { reason: String },
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Interrupted,
    NewDirectory { directory: String },
    Fatal { reason: String },
}

/// A state change seen during a tick, with any restart notes.
struct Change {
    index: usize,
    text: String,
}

pub struct Supervisor {
    settings: SupervisorSettings,
    inspector: Box<dyn Inspector>,
    runner: Box<dyn CommandRunner>,
    notifier: Box<dyn Notifier>,
    cancel: CancelToken,
    checks: Vec<Tracked>,
    heartbeat: Option<HeartbeatSchedule>,
    watcher: Option<DataDirWatcher>,
    /// Set once the notifier failed authentication; no more reports after that.
    notifier_broken: bool,
}

impl Supervisor {
    pub fn new(
        settings: SupervisorSettings,
        collaborators: Collaborators,
        cancel: CancelToken,
    ) -> Self {
        Self {
            settings,
            inspector: collaborators.inspector,
            runner: collaborators.runner,
            notifier: collaborators.notifier,
            cancel,
            checks: Vec::new(),
            heartbeat: None,
            watcher: None,
            notifier_broken: false,
        }
    }

    /// Add checks, capturing each one's baseline state.
    pub fn with_checks(mut self, checks: impl IntoIterator<Item = Check>) -> Self {
        for check in checks {
            self.add_check(check);
        }
        self
    }

    pub fn add_check(&mut self, check: Check) {
        let tracked = Tracked::new(check, self.inspector.as_ref(), Local::now());
        info!(
            kind = %tracked.check().kind(),
            check = %tracked.describe(self.inspector.as_ref(), Local::now()),
            "added check"
        );
        self.checks.push(tracked);
    }

    pub fn with_heartbeat(mut self, heartbeat: HeartbeatSchedule) -> Self {
        self.heartbeat = Some(heartbeat);
        self
    }

    pub fn with_watcher(mut self, watcher: DataDirWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn checks(&self) -> &[Tracked] {
        &self.checks
    }

    pub fn heartbeat(&self) -> Option<&HeartbeatSchedule> {
        self.heartbeat.as_ref()
    }

    pub fn watcher(&self) -> Option<&DataDirWatcher> {
        self.watcher.as_ref()
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    /// `name=STATE...` for every check, from the tracked states.
    pub fn current_state(&self, now: DateTime<Local>) -> Vec<String> {
        self.checks
            .iter()
            .map(|t| t.describe(self.inspector.as_ref(), now))
            .collect()
    }

    /// Send the initial heartbeat and arm the schedule for the current hour.
    pub fn start(&mut self) -> TickOutcome {
        self.start_at(Local::now())
    }

    pub fn start_at(&mut self, now: DateTime<Local>) -> TickOutcome {
        info!(checks = self.checks.len(), "supervisor starting");
        if let Some(heartbeat) = self.heartbeat.as_mut() {
            heartbeat.mark_checked(now.hour());
        }

        let report = self.heartbeat_report(ReportKind::Running, now, None);
        match self.send(&report) {
            Ok(()) => TickOutcome::Continue,
            Err(e) => TickOutcome::FatalShutdown {
                reason: e.to_string(),
            },
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.tick_at(Local::now())
    }

    /// One sweep: edge detection, restarts, alert, heartbeat, drift.
    pub fn tick_at(&mut self, now: DateTime<Local>) -> TickOutcome {
        let inspector = self.inspector.as_ref();
        let settle_delta =
            TimeDelta::from_std(self.settings.restart_settle).unwrap_or(TimeDelta::zero());
        let mut changes: Vec<Change> = Vec::new();

        for (index, tracked) in self.checks.iter_mut().enumerate() {
            if tracked.just_changed(inspector, now) {
                changes.push(Change {
                    index,
                    text: tracked.describe(inspector, now),
                });
            }
        }

        // Restarts run on every FAIL tick, not only on the edge
        for index in 0..self.checks.len() {
            if self.checks[index].last_state().is_ok() {
                continue;
            }
            let Some(process) = self.checks[index].check_mut().as_process_mut() else {
                continue;
            };

            let note = match process.restart(self.runner.as_ref(), now) {
                RestartOutcome::NotConfigured => continue,
                RestartOutcome::Exhausted { attempts } => {
                    let name = process.name().to_string();
                    error!(process = %name, attempts, "giving up on process");
                    return TickOutcome::FatalShutdown {
                        reason: format!("{name} still failing after {attempts} restart attempts"),
                    };
                }
                RestartOutcome::SpawnFailed { attempt, error } => {
                    format!("Restart attempt {attempt} failed: {error}")
                }
                RestartOutcome::Spawned { attempt } => {
                    let max = process.policy().max_retries();
                    if !self.cancel.sleep(self.settings.restart_settle) {
                        debug!("interrupted while waiting for restart to settle");
                    }
                    let tracked = &mut self.checks[index];
                    let settled_at = now + settle_delta;
                    if tracked.just_changed(self.inspector.as_ref(), settled_at) {
                        // A recovery (or relapse) seen here belongs to this tick
                        if !changes.iter().any(|c| c.index == index) {
                            changes.push(Change {
                                index,
                                text: String::new(),
                            });
                        }
                    }
                    format!(
                        "Attempting to restart ({attempt}/{max})... {}",
                        tracked.describe(self.inspector.as_ref(), settled_at)
                    )
                }
            };

            if let Some(change) = changes.iter_mut().find(|c| c.index == index) {
                if change.text.is_empty() {
                    change.text = note;
                } else {
                    change.text = format!("{}. {note}", change.text);
                }
            } else {
                info!(note = %note, "restart attempted for failing process");
            }
        }

        if !changes.is_empty() {
            changes.sort_by_key(|c| c.index);
            let report = self.state_change_report(changes, now);
            if let Err(e) = self.send(&report) {
                return TickOutcome::FatalShutdown {
                    reason: e.to_string(),
                };
            }
        }

        let heartbeat_due = self
            .heartbeat
            .as_mut()
            .is_some_and(|h| h.due(now.hour()));
        if heartbeat_due {
            let report = self.heartbeat_report(ReportKind::Heartbeat, now, None);
            if let Err(e) = self.send(&report) {
                return TickOutcome::FatalShutdown {
                    reason: e.to_string(),
                };
            }
        }

        if let Some(directory) = self.watcher.as_ref().and_then(DataDirWatcher::drifted) {
            warn!(%directory, "new data directory found");
            let preface = format!("New data directory found: {directory}. Restarting session.");
            let report = self.heartbeat_report(ReportKind::NewDirectory, now, Some(preface));
            if let Err(e) = self.send(&report) {
                return TickOutcome::FatalShutdown {
                    reason: e.to_string(),
                };
            }
            return TickOutcome::RestartSession { directory };
        }

        TickOutcome::Continue
    }

    /// Start, then tick until interrupted or a terminal condition.
    pub fn run(&mut self) -> SessionEnd {
        if let TickOutcome::FatalShutdown { reason } = self.start() {
            self.shutdown(&reason);
            return SessionEnd::Fatal { reason };
        }

        loop {
            if !self.cancel.sleep(self.settings.poll_interval) {
                self.shutdown("interrupted");
                return SessionEnd::Interrupted;
            }

            match self.tick() {
                TickOutcome::Continue => {}
                TickOutcome::RestartSession { directory } => {
                    return SessionEnd::NewDirectory { directory };
                }
                TickOutcome::FatalShutdown { reason } => {
                    self.shutdown(&reason);
                    return SessionEnd::Fatal { reason };
                }
            }
        }
    }

    /// Send a final report with the current state of all checks.
    ///
    /// Uses its own cancel token so retries still happen after an interrupt.
    pub fn shutdown(&mut self, reason: &str) {
        info!(%reason, "supervisor shutting down");
        if self.notifier_broken {
            return;
        }

        let now = Local::now();
        let mut report = Report::new(ReportKind::Shutdown, now);
        report
            .paragraph("Babysitter SHUTTING DOWN.")
            .paragraph(format!("Reason: {reason}"))
            .list(self.current_state(now))
            .timestamp();

        if let Err(e) = deliver(
            self.notifier.as_ref(),
            &report,
            &self.settings.delivery,
            &CancelToken::new(),
        ) {
            error!(error = %e, "failed to send shutdown report");
        }
    }

    fn state_change_report(&self, changes: Vec<Change>, now: DateTime<Local>) -> Report {
        let mut report = Report::new(ReportKind::StateChange, now);
        report
            .heading("STATE CHANGED:")
            .list(changes.into_iter().map(|c| c.text).collect())
            .heading("CURRENT STATE OF ALL CHECKERS:")
            .list(self.current_state(now));

        for diagnostic in &self.settings.alert_commands {
            if self.cancel.is_cancelled() {
                break;
            }
            report.extend(diagnostic_blocks(diagnostic, self.runner.as_ref()));
        }

        report.timestamp();
        report
    }

    /// Current state, heartbeat diagnostics and the relayed report file.
    fn heartbeat_report(
        &self,
        kind: ReportKind,
        now: DateTime<Local>,
        preface: Option<String>,
    ) -> Report {
        let mut report = Report::new(kind, now);
        if let Some(preface) = preface {
            report.paragraph(preface);
        }
        report.list(self.current_state(now));

        let Some(heartbeat) = &self.heartbeat else {
            report.timestamp();
            return report;
        };

        for diagnostic in heartbeat.commands() {
            if self.cancel.is_cancelled() {
                break;
            }
            report.extend(diagnostic_blocks(diagnostic, self.runner.as_ref()));
        }

        let relayed = heartbeat
            .report_file()
            .is_some_and(|path| relay_html_file(&mut report, path));
        if !relayed {
            report.timestamp();
        }
        report
    }

    /// Deliver a report. Only authentication failures come back as errors.
    fn send(&mut self, report: &Report) -> Result<(), NotifyError> {
        if self.notifier_broken {
            return Ok(());
        }
        match deliver(
            self.notifier.as_ref(),
            report,
            &self.settings.delivery,
            &self.cancel,
        ) {
            Ok(_) => Ok(()),
            Err(e) => {
                self.notifier_broken = e.is_auth();
                Err(e)
            }
        }
    }
}
