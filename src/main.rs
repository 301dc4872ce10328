use anyhow::Result;
use babysitter::commands::{run, status, validate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "babysitter")]
#[command(
    about = "Watch disk space, processes and data files; alert on state changes",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Supervise until interrupted
    Run {
        /// Path to the config file (default: ./babysitter.toml, then the user config directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Also write DEBUG level logs to this file
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Log at DEBUG level on stderr
        #[arg(short, long)]
        verbose: bool,
    },

    /// Evaluate every check once and print its state
    Status {
        /// Path to the config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Load and resolve the config without running
    Validate {
        /// Path to the config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            log_file,
            verbose,
        } => run::execute(config.as_deref(), log_file, verbose),
        Commands::Status { config } => status::execute(config.as_deref()),
        Commands::Validate { config } => {
            validate::execute(config.as_deref()).map(|()| ExitCode::SUCCESS)
        }
    }
}
