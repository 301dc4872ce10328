use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Startup configuration failures. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config file found (looked in {})", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },

    #[error("failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("environment variable {var} is not set (used in {field})")]
    MissingEnv { var: String, field: String },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("data directory {} is not usable", .path.display())]
    DataDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{line}: {reason}", .path.display())]
    Labels {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("failed to read labels file {}", .path.display())]
    LabelsUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("interrupted during startup")]
    Interrupted,
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
