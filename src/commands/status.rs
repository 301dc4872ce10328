//! Status command - evaluate every check once and print the result

use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use std::path::Path;
use std::process::ExitCode;

use crate::checks::SystemInspector;
use crate::config::{build_checks, resolve_data_dir};
use crate::monitor::Tracked;
use crate::supervisor::CancelToken;

use super::load_config;

pub fn execute(config: Option<&Path>) -> Result<ExitCode> {
    let (path, config) = load_config(config)?;
    println!("{} {}", "Config:".bold(), path.display());

    let data_dir = match &config.data_dir {
        Some(d) => Some(resolve_data_dir(d, &CancelToken::new())?),
        None => None,
    };
    if let Some(data) = &data_dir {
        println!("{} {}", "Data directory:".bold(), data.dir.display());
    }

    let inspector = SystemInspector::new();
    let now = Local::now();
    let checks: Vec<Tracked> = build_checks(&config, data_dir.as_ref(), &inspector)
        .into_iter()
        .map(|check| Tracked::new(check, &inspector, now))
        .collect();

    if checks.is_empty() {
        println!("{} No checks configured", "─".dimmed());
        return Ok(ExitCode::SUCCESS);
    }

    let mut failing = 0;
    for tracked in &checks {
        let line = tracked.describe(&inspector, now);
        if tracked.last_state().is_ok() {
            println!("{} {}", "✓".green().bold(), line);
        } else {
            failing += 1;
            println!("{} {}", "✗".red().bold(), line.red());
        }
    }

    println!();
    if failing == 0 {
        println!("{} All {} checks OK", "✓".green().bold(), checks.len());
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{} {failing} of {} checks failing", "✗".red().bold(), checks.len());
        Ok(ExitCode::FAILURE)
    }
}
