//! Run command - supervise until interrupted or a fatal condition

use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use crate::config::{build_supervisor, session_policy};
use crate::logging;
use crate::supervisor::{run_sessions, CancelToken, SessionExit};

use super::load_config;

pub fn execute(
    config: Option<&Path>,
    log_file: Option<PathBuf>,
    verbose: bool,
) -> Result<ExitCode> {
    let (path, config) = load_config(config)?;

    let level = if verbose { "debug" } else { config.logging.level.as_str() };
    let log_file = log_file.or_else(|| config.logging.file.as_ref().map(PathBuf::from));
    let _log = logging::init(level, log_file.as_deref())?;

    info!(
        config = %path.display(),
        unixtime = Local::now().timestamp(),
        "babysitter starting up"
    );

    let cancel = CancelToken::new();
    cancel.install_signal_handler()?;

    let exit = run_sessions(
        || build_supervisor(&config, &cancel).context("Failed to build session"),
        session_policy(&config),
        &cancel,
    );

    match &exit {
        SessionExit::Interrupted => info!("babysitter stopped"),
        SessionExit::Fatal { reason } => error!(%reason, "babysitter stopped on fatal condition"),
    }

    Ok(ExitCode::from(exit.exit_code()))
}
