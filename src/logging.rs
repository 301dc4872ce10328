//! Log setup.
//!
//! Human readable lines go to stderr, filtered by `RUST_LOG` or the
//! configured level. An optional file receives everything at DEBUG.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Keeps the subscriber installed. Logging stops when it is dropped.
pub struct LogHandle {
    _guard: DefaultGuard,
    file: Option<PathBuf>,
}

impl LogHandle {
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

pub fn init(level: &str, file: Option<&Path>) -> Result<LogHandle> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level: {level}"))?;

    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(filter);

    let file_layer = match file {
        Some(path) => {
            let f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(f))
                    .with_ansi(false)
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    let subscriber = Registry::default().with(stderr).with(file_layer);
    let guard = tracing::subscriber::set_default(subscriber);

    Ok(LogHandle {
        _guard: guard,
        file: file.map(Path::to_path_buf),
    })
}
