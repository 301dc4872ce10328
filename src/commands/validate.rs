//! Validate command - load and resolve the config without running

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::config::{resolve_data_dir, Config};
use crate::supervisor::CancelToken;

use super::load_config;

pub fn execute(config: Option<&Path>) -> Result<()> {
    let (path, config) = load_config(config)?;

    println!("{} {}", "Config:".bold(), path.display());
    for line in summary(&config) {
        println!("  {line}");
    }

    if let Some(d) = &config.data_dir {
        let data = resolve_data_dir(d, &CancelToken::new())?;
        println!(
            "  data directory: {} ({} channels)",
            data.dir.display(),
            data.labels.len()
        );
    }

    println!("{} Config is valid", "✓".green().bold());
    Ok(())
}

fn summary(config: &Config) -> Vec<String> {
    let mut lines = vec![
        format!("notifier: {:?}", config.notify.kind).to_lowercase(),
        format!("poll interval: {}s", config.supervisor.poll_interval_secs),
        format!("disk space checks: {}", config.disk_space.len()),
        format!("process checks: {}", config.process.len()),
        format!("file checks: {}", config.file.len()),
        format!("file growth checks: {}", config.file_growth.len()),
        format!("alert commands: {}", config.alert_command.len()),
    ];
    match &config.heartbeat {
        Some(h) => lines.push(format!(
            "heartbeat: {:02}:00 with {} commands",
            h.hour,
            h.commands.len()
        )),
        None => lines.push("heartbeat: disabled".to_string()),
    }
    lines
}
