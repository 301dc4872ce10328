//! Turning a loaded [`Config`] into a running supervisor.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::{Config, DataDirConfig, NotifyConfig, NotifyKind};
use crate::checks::{
    Check, DiskSpace, FileFreshness, FileGrowth, Inspector, ProcessCheck, SystemInspector,
};
use crate::error::ConfigError;
use crate::monitor::datadir::{self, wait_for_labels};
use crate::monitor::{ChannelLabel, DataDirWatcher, HeartbeatSchedule, RestartPolicy};
use crate::notify::{DeliveryPolicy, LogNotifier, MailCommandNotifier, Notifier, WebhookNotifier};
use crate::runner::ShellRunner;
use crate::supervisor::{CancelToken, Collaborators, SessionPolicy, Supervisor, SupervisorSettings};

/// The data directory a session binds to, with its channel labels.
#[derive(Debug, Clone)]
pub struct ResolvedDataDir {
    /// Directory the numbered subdirectories live in.
    pub base: PathBuf,
    /// Directory holding the labels and channel files.
    pub dir: PathBuf,
    /// Selected numbered subdirectory, when numbered subdirectories are used.
    pub subdir: Option<String>,
    pub labels: Vec<ChannelLabel>,
    pub timeout: Duration,
}

impl ResolvedDataDir {
    pub fn watcher(&self) -> DataDirWatcher {
        DataDirWatcher::new(&self.base, self.subdir.clone())
    }
}

/// Select the data directory and read its labels file, waiting for it.
pub fn resolve_data_dir(
    config: &DataDirConfig,
    cancel: &CancelToken,
) -> Result<ResolvedDataDir, ConfigError> {
    let (dir, subdir) = datadir::resolve_data_dir(Path::new(&config.base), config.numeric_subdirs)?;
    let base = match (&subdir, dir.parent()) {
        (Some(_), Some(parent)) => parent.to_path_buf(),
        _ => dir.clone(),
    };

    let labels_path = dir.join(&config.labels_file);
    let labels = wait_for_labels(
        &labels_path,
        config.labels_attempts,
        Duration::from_secs(config.labels_wait_secs),
        cancel,
    )?;
    info!(labels = labels.len(), path = %labels_path.display(), "loaded channel labels");

    Ok(ResolvedDataDir {
        base,
        dir,
        subdir,
        labels,
        timeout: Duration::from_secs(config.timeout_secs),
    })
}

/// Every check named by `config`, plus one freshness check per data channel.
pub fn build_checks(
    config: &Config,
    data_dir: Option<&ResolvedDataDir>,
    inspector: &dyn Inspector,
) -> Vec<Check> {
    let now = Local::now();
    let sup = &config.supervisor;
    let mut checks: Vec<Check> = Vec::new();

    for d in &config.disk_space {
        let interval = config.poll_interval();
        let disk = DiskSpace::new(&d.mount_point, d.threshold_mb, interval, inspector, now);
        checks.push(disk.into());
    }

    for p in &config.process {
        let policy = RestartPolicy::new(
            p.restart_command.clone(),
            sup.max_retries,
            Duration::from_secs(sup.reset_retries_after_secs),
        );
        checks.push(ProcessCheck::new(&p.name, policy).into());
    }

    for f in &config.file {
        let timeout = Duration::from_secs(f.timeout_secs);
        checks.push(FileFreshness::new(&f.path, timeout, f.label.clone()).into());
    }

    if let Some(data) = data_dir {
        for label in &data.labels {
            let path = label.data_file(&data.dir);
            checks.push(FileFreshness::new(path, data.timeout, Some(label.label.clone())).into());
        }
    }

    for g in &config.file_growth {
        checks.push(FileGrowth::new(&g.path).into());
    }

    checks
}

pub fn build_notifier(config: &NotifyConfig) -> Result<Box<dyn Notifier>, ConfigError> {
    let notifier: Box<dyn Notifier> = match config.kind {
        NotifyKind::Log => Box::new(LogNotifier::new()),
        NotifyKind::Webhook => {
            let url = config.url.clone().ok_or_else(|| {
                ConfigError::invalid("notify.url", "required for webhook notifications")
            })?;
            let notifier = WebhookNotifier::new(url)
                .map_err(|e| ConfigError::invalid("notify.url", e.to_string()))?
                .with_subject_prefix(&config.subject_prefix);
            Box::new(notifier)
        }
        NotifyKind::Mail => {
            let required = |value: &Option<String>, field: &str| {
                value
                    .clone()
                    .ok_or_else(|| ConfigError::invalid(field, "required for mail notifications"))
            };
            let notifier = MailCommandNotifier::new(
                required(&config.command, "notify.command")?,
                required(&config.from, "notify.from")?,
                required(&config.to, "notify.to")?,
            )
            .with_subject_prefix(&config.subject_prefix);
            Box::new(notifier)
        }
    };
    Ok(notifier)
}

pub fn supervisor_settings(config: &Config) -> SupervisorSettings {
    SupervisorSettings {
        poll_interval: config.poll_interval(),
        restart_settle: Duration::from_secs(config.supervisor.restart_settle_secs),
        alert_commands: config.alert_command.clone(),
        delivery: DeliveryPolicy {
            attempts: config.notify.send_attempts,
            retry_delay: Duration::from_secs(config.notify.retry_delay_secs),
        },
    }
}

pub fn session_policy(config: &Config) -> SessionPolicy {
    SessionPolicy {
        max_restarts: config.supervisor.max_session_restarts,
        reset_after: Duration::from_secs(config.supervisor.session_reset_after_secs),
        restart_delay: Duration::from_secs(config.supervisor.session_restart_delay_secs),
    }
}

/// Build a supervisor for one session against the live system.
pub fn build_supervisor(config: &Config, cancel: &CancelToken) -> Result<Supervisor, ConfigError> {
    let data_dir = config
        .data_dir
        .as_ref()
        .map(|d| resolve_data_dir(d, cancel))
        .transpose()?;

    let inspector = SystemInspector::new();
    let checks = build_checks(config, data_dir.as_ref(), &inspector);

    let runner = ShellRunner::new()
        .with_timeout(Duration::from_secs(config.supervisor.command_timeout_secs));
    let collaborators = Collaborators {
        inspector: Box::new(inspector),
        runner: Box::new(runner),
        notifier: build_notifier(&config.notify)?,
    };

    let mut supervisor = Supervisor::new(supervisor_settings(config), collaborators, cancel.clone())
        .with_checks(checks);

    if let Some(h) = &config.heartbeat {
        supervisor = supervisor.with_heartbeat(
            HeartbeatSchedule::new(Some(h.hour))
                .with_commands(h.commands.clone())
                .with_report_file(h.report_file.as_ref().map(PathBuf::from)),
        );
    }

    let numbered = config.data_dir.as_ref().is_some_and(|d| d.numeric_subdirs);
    if let Some(data) = data_dir.filter(|_| numbered) {
        supervisor = supervisor.with_watcher(data.watcher());
    }

    Ok(supervisor)
}
