//! CLI module for costgate
//!
//! # Commands
//!
//! - `run` - Run a single cycle (for a systemd timer or cron)
//! - `daemon` - Run cycles on a fixed interval until SIGINT/SIGTERM
//! - `status` - Show the last applied decision
//! - `config` - Configuration utilities (init, validate)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # One cycle, decide only
//! costgate run --dry-run
//!
//! # Last decision as JSON
//! costgate status --json
//!
//! # Generate shell completions
//! costgate completions bash > ~/.bash_completion.d/costgate
//! ```

pub mod completions;
pub mod config;
pub mod run;
pub mod status;

pub use completions::handle_completions;
pub use config::{handle_config_init, handle_config_validate};
pub use run::{run_daemon, run_once};
pub use status::handle_status;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_CONFIG_PATH: &str = "/etc/costgate/costgate.toml";

/// costgate - Budget-driven streaming quality controller
#[derive(Parser, Debug)]
#[command(
    name = "costgate",
    version,
    about = "Caps media server streaming bitrate as cloud spend approaches budget"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single budget check and apply cycle
    Run(RunArgs),
    /// Run cycles periodically until stopped
    Daemon(DaemonArgs),
    /// Show the last applied decision
    Status(StatusArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, env = "COSTGATE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Decide and report without touching the media server or state file
    #[arg(long)]
    pub dry_run: bool,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,
}

#[derive(Args, Debug)]
pub struct DaemonArgs {
    /// Path to configuration file
    #[arg(short, long, env = "COSTGATE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Override poll interval in seconds
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Path to configuration file
    #[arg(short, long, env = "COSTGATE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
    /// Check a configuration file without running a cycle
    Validate(ConfigValidateArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "costgate.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ConfigValidateArgs {
    /// Path to configuration file
    #[arg(short, long, env = "COSTGATE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
