//! Startup configuration
//!
//! Loaded once from a TOML file. String values that name paths or commands
//! may reference environment variables as `${VAR}`; every reference must be
//! set. There is no reload: a changed file takes effect on the next start.

mod build;
mod env;

pub use build::{
    build_checks, build_notifier, build_supervisor, resolve_data_dir, session_policy,
    supervisor_settings, ResolvedDataDir,
};
pub use env::expand;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::constants::{
    DIAGNOSTIC_TIMEOUT, MAX_RETRIES, MAX_SESSION_RESTARTS, RESET_RETRIES_AFTER, RESTART_SETTLE,
    SEND_ATTEMPTS, SEND_RETRY_DELAY, SESSION_RESTART_DELAY, UPDATE_PERIOD,
};
use crate::report::DiagnosticCommand;

/// Config file name looked up when no path is given.
pub const CONFIG_FILE_NAME: &str = "babysitter.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub disk_space: Vec<DiskSpaceConfig>,
    #[serde(default)]
    pub file: Vec<FileConfig>,
    #[serde(default)]
    pub process: Vec<ProcessConfig>,
    #[serde(default)]
    pub file_growth: Vec<FileGrowthConfig>,
    /// Diagnostics appended to state-change alerts.
    #[serde(default)]
    pub alert_command: Vec<DiagnosticCommand>,
    pub heartbeat: Option<HeartbeatConfig>,
    pub data_dir: Option<DataDirConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SupervisorConfig {
    pub poll_interval_secs: u64,
    pub max_retries: u32,
    pub reset_retries_after_secs: u64,
    pub restart_settle_secs: u64,
    pub command_timeout_secs: u64,
    pub max_session_restarts: u32,
    pub session_restart_delay_secs: u64,
    pub session_reset_after_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: UPDATE_PERIOD.as_secs(),
            max_retries: MAX_RETRIES,
            reset_retries_after_secs: RESET_RETRIES_AFTER.as_secs(),
            restart_settle_secs: RESTART_SETTLE.as_secs(),
            command_timeout_secs: DIAGNOSTIC_TIMEOUT.as_secs(),
            max_session_restarts: MAX_SESSION_RESTARTS,
            session_restart_delay_secs: SESSION_RESTART_DELAY.as_secs(),
            session_reset_after_secs: RESET_RETRIES_AFTER.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyKind {
    Webhook,
    Mail,
    #[default]
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotifyConfig {
    pub kind: NotifyKind,
    pub url: Option<String>,
    pub command: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject_prefix: String,
    pub send_attempts: u32,
    pub retry_delay_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            kind: NotifyKind::Log,
            url: None,
            command: None,
            from: None,
            to: None,
            subject_prefix: String::new(),
            send_attempts: SEND_ATTEMPTS,
            retry_delay_secs: SEND_RETRY_DELAY.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// DEBUG level log file in addition to stderr.
    pub file: Option<String>,
    /// Filter for stderr output. `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiskSpaceConfig {
    #[serde(default = "default_mount_point")]
    pub mount_point: String,
    pub threshold_mb: f64,
}

fn default_mount_point() -> String {
    "/".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub path: String,
    #[serde(default = "default_file_timeout")]
    pub timeout_secs: u64,
    pub label: Option<String>,
}

fn default_file_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessConfig {
    pub name: String,
    pub restart_command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileGrowthConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeartbeatConfig {
    /// Hour of day, 0-23.
    pub hour: u32,
    pub report_file: Option<String>,
    #[serde(default, rename = "command")]
    pub commands: Vec<DiagnosticCommand>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataDirConfig {
    pub base: String,
    #[serde(default = "default_true")]
    pub numeric_subdirs: bool,
    #[serde(default = "default_file_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_labels_file")]
    pub labels_file: String,
    #[serde(default = "default_labels_wait")]
    pub labels_wait_secs: u64,
    #[serde(default = "default_labels_attempts")]
    pub labels_attempts: u32,
}

fn default_true() -> bool {
    true
}

fn default_labels_file() -> String {
    "labels.dat".to_string()
}

fn default_labels_wait() -> u64 {
    10
}

fn default_labels_attempts() -> u32 {
    3
}

impl Config {
    /// Read, parse and resolve the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse TOML `content`, then expand environment references and validate.
    /// `path` is only used in error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.expand_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Config file to use: `explicit` if given, else `babysitter.toml` in
    /// the working directory, else the user config directory.
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        let mut searched = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            searched.push(dir.join("babysitter").join(CONFIG_FILE_NAME));
        }

        match searched.iter().find(|p| p.is_file()) {
            Some(found) => Ok(found.clone()),
            None => Err(ConfigError::NotFound { searched }),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.supervisor.poll_interval_secs)
    }

    /// Total number of statically configured checks (data directory
    /// channels are only known after the labels file is read).
    pub fn static_check_count(&self) -> usize {
        self.disk_space.len() + self.file.len() + self.process.len() + self.file_growth.len()
    }

    fn expand_env(&mut self) -> Result<(), ConfigError> {
        fn field(value: &mut String, name: &str) -> Result<(), ConfigError> {
            *value = expand(value, name)?;
            Ok(())
        }
        fn optional(value: &mut Option<String>, name: &str) -> Result<(), ConfigError> {
            if let Some(v) = value.as_mut() {
                field(v, name)?;
            }
            Ok(())
        }
        fn commands(list: &mut [DiagnosticCommand], name: &str) -> Result<(), ConfigError> {
            for c in list.iter_mut() {
                field(&mut c.command, name)?;
            }
            Ok(())
        }

        optional(&mut self.notify.url, "notify.url")?;
        optional(&mut self.notify.command, "notify.command")?;
        optional(&mut self.notify.from, "notify.from")?;
        optional(&mut self.notify.to, "notify.to")?;
        optional(&mut self.logging.file, "logging.file")?;

        for d in &mut self.disk_space {
            field(&mut d.mount_point, "disk_space.mount_point")?;
        }
        for f in &mut self.file {
            field(&mut f.path, "file.path")?;
        }
        for p in &mut self.process {
            optional(&mut p.restart_command, "process.restart_command")?;
        }
        for g in &mut self.file_growth {
            field(&mut g.path, "file_growth.path")?;
        }
        commands(&mut self.alert_command, "alert_command.command")?;

        if let Some(h) = &mut self.heartbeat {
            optional(&mut h.report_file, "heartbeat.report_file")?;
            commands(&mut h.commands, "heartbeat.command")?;
        }
        if let Some(d) = &mut self.data_dir {
            field(&mut d.base, "data_dir.base")?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.supervisor.poll_interval_secs == 0 {
            return Err(ConfigError::invalid("supervisor.poll_interval_secs", "must be at least 1"));
        }
        if self.notify.send_attempts == 0 {
            return Err(ConfigError::invalid("notify.send_attempts", "must be at least 1"));
        }

        match self.notify.kind {
            NotifyKind::Webhook if blank(&self.notify.url) => {
                return Err(ConfigError::invalid(
                    "notify.url",
                    "required for webhook notifications",
                ));
            }
            NotifyKind::Mail => {
                for (name, value) in [
                    ("notify.command", &self.notify.command),
                    ("notify.from", &self.notify.from),
                    ("notify.to", &self.notify.to),
                ] {
                    if blank(value) {
                        return Err(ConfigError::invalid(name, "required for mail notifications"));
                    }
                }
            }
            _ => {}
        }

        for d in &self.disk_space {
            if !d.threshold_mb.is_finite() || d.threshold_mb < 0.0 {
                return Err(ConfigError::invalid(
                    "disk_space.threshold_mb",
                    format!("must be a non-negative number, got {}", d.threshold_mb),
                ));
            }
        }
        for p in &self.process {
            if p.name.trim().is_empty() {
                return Err(ConfigError::invalid("process.name", "must not be empty"));
            }
        }
        if let Some(h) = &self.heartbeat {
            if h.hour > 23 {
                return Err(ConfigError::invalid(
                    "heartbeat.hour",
                    format!("must be between 0 and 23, got {}", h.hour),
                ));
            }
        }
        Ok(())
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}
