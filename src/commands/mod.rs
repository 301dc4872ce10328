pub mod run;
pub mod status;
pub mod validate;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Locate and load the config file.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<(PathBuf, Config)> {
    let path = Config::locate(explicit)?;
    let config = Config::load(&path)
        .with_context(|| format!("Failed to load config: {}", path.display()))?;
    Ok((path, config))
}
