//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "turret", version, about = "Sentry turret controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/turret.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Track, alert and (when armed) fire until interrupted
    Run {
        /// Stop after this many loop iterations (overrides runner.max_iterations)
        #[arg(long, value_name = "N")]
        max_iterations: Option<u64>,
        /// Keep the fire servo stopped regardless of triggers
        #[arg(long, action = ArgAction::SetTrue)]
        disable_turret: bool,
        /// Directory for event captures (overrides capture.dir)
        #[arg(long, value_name = "DIR")]
        capture_dir: Option<PathBuf>,
        /// Print loop and alert stats on exit
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
    },
    /// Validate the config and open the backends without moving anything
    SelfCheck,
}
