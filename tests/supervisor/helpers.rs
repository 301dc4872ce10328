//! Fakes and fixtures shared by the supervisor scenarios

use anyhow::Result;
use babysitter::checks::{Check, DiskSpace, Inspector, ProcessCheck};
use babysitter::monitor::RestartPolicy;
use babysitter::notify::{DeliveryPolicy, Notifier, NotifyError};
use babysitter::report::{Report, ReportKind};
use babysitter::runner::{CommandOutput, CommandRunner, SpawnOutcome};
use babysitter::supervisor::{CancelToken, Collaborators, Supervisor, SupervisorSettings};
use chrono::Local;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

pub const FAKE_PID: u32 = 4242;

/// Shared view of the pretend machine.
#[derive(Default)]
pub struct FakeSystem {
    alive: RefCell<HashSet<String>>,
    free_mb: Cell<f64>,
    /// When true, a `restart <name>` command brings `<name>` back.
    revive_on_restart: Cell<bool>,
    spawned: RefCell<Vec<String>>,
    ran: RefCell<Vec<String>>,
    sent: RefCell<Vec<Report>>,
}

impl FakeSystem {
    pub fn set_alive(&self, name: &str, alive: bool) {
        if alive {
            self.alive.borrow_mut().insert(name.to_string());
        } else {
            self.alive.borrow_mut().remove(name);
        }
    }

    pub fn set_free_mb(&self, free: f64) {
        self.free_mb.set(free);
    }

    pub fn set_revive_on_restart(&self, revive: bool) {
        self.revive_on_restart.set(revive);
    }

    pub fn spawned(&self) -> Vec<String> {
        self.spawned.borrow().clone()
    }

    pub fn ran(&self) -> Vec<String> {
        self.ran.borrow().clone()
    }

    pub fn sent(&self) -> Vec<Report> {
        self.sent.borrow().clone()
    }

    pub fn sent_kinds(&self) -> Vec<ReportKind> {
        self.sent.borrow().iter().map(Report::kind).collect()
    }
}

pub struct FakeInspector(pub Rc<FakeSystem>);

impl Inspector for FakeInspector {
    fn free_space_mb(&self, _path: &Path) -> io::Result<f64> {
        Ok(self.0.free_mb.get())
    }

    fn find_process(&self, name: &str) -> io::Result<Vec<u32>> {
        if self.0.alive.borrow().contains(name) {
            Ok(vec![FAKE_PID])
        } else {
            Ok(Vec::new())
        }
    }
}

pub struct FakeRunner(pub Rc<FakeSystem>);

impl CommandRunner for FakeRunner {
    fn run(&self, command: &str) -> Result<CommandOutput> {
        self.0.ran.borrow_mut().push(command.to_string());
        Ok(CommandOutput::new(
            command,
            true,
            format!("output of {command}"),
            String::new(),
        ))
    }

    fn spawn(&self, command: &str) -> Result<SpawnOutcome> {
        self.0.spawned.borrow_mut().push(command.to_string());
        if self.0.revive_on_restart.get() {
            if let Some(name) = command.strip_prefix("restart ") {
                self.0.set_alive(name, true);
            }
        }
        Ok(SpawnOutcome::Running { pid: FAKE_PID })
    }
}

pub struct RecordingNotifier(pub Rc<FakeSystem>);

impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&self, report: &Report) -> Result<(), NotifyError> {
        self.0.sent.borrow_mut().push(report.clone());
        Ok(())
    }
}

/// Accepts the first `accept` reports, then refuses credentials.
pub struct AuthFailingNotifier {
    pub system: Rc<FakeSystem>,
    pub accept: usize,
    pub calls: Rc<Cell<usize>>,
}

impl Notifier for AuthFailingNotifier {
    fn name(&self) -> &str {
        "auth-failing"
    }

    fn send(&self, report: &Report) -> Result<(), NotifyError> {
        self.calls.set(self.calls.get() + 1);
        if self.calls.get() > self.accept {
            return Err(NotifyError::Auth {
                transport: "fake",
                message: "bad credentials".to_string(),
            });
        }
        self.system.sent.borrow_mut().push(report.clone());
        Ok(())
    }
}

/// Settings with no waiting anywhere.
pub fn fast_settings() -> SupervisorSettings {
    SupervisorSettings {
        poll_interval: Duration::from_millis(1),
        restart_settle: Duration::ZERO,
        alert_commands: Vec::new(),
        delivery: DeliveryPolicy {
            attempts: 1,
            retry_delay: Duration::ZERO,
        },
    }
}

pub fn supervisor(
    system: &Rc<FakeSystem>,
    settings: SupervisorSettings,
    cancel: CancelToken,
) -> Supervisor {
    let notifier = Box::new(RecordingNotifier(Rc::clone(system)));
    supervisor_with_notifier(system, notifier, settings, cancel)
}

pub fn supervisor_with_notifier(
    system: &Rc<FakeSystem>,
    notifier: Box<dyn Notifier>,
    settings: SupervisorSettings,
    cancel: CancelToken,
) -> Supervisor {
    let collaborators = Collaborators {
        inspector: Box::new(FakeInspector(Rc::clone(system))),
        runner: Box::new(FakeRunner(Rc::clone(system))),
        notifier,
    };
    Supervisor::new(settings, collaborators, cancel)
}

/// Process check restarted with `restart <name>`.
pub fn process(name: &str, max_retries: u32) -> Check {
    let policy = RestartPolicy::new(
        Some(format!("restart {name}")),
        max_retries,
        Duration::from_secs(3600),
    );
    ProcessCheck::new(name, policy).into()
}

pub fn disk(system: &Rc<FakeSystem>, threshold_mb: f64) -> Check {
    DiskSpace::new(
        "/",
        threshold_mb,
        Duration::from_secs(3600),
        &FakeInspector(Rc::clone(system)),
        Local::now(),
    )
    .into()
}
