// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `assetflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetflow",
    version,
    about = "Compile, minify, watch and ship front-end assets.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run (`scss`, `min`, `dev`, `build`, `concat`, ...) or `watch`.
    #[arg(value_name = "TASK", required_unless_present = "list")]
    pub task: Option<String>,

    /// Path to the config file (TOML).
    ///
    /// When the default file does not exist, built-in defaults are used.
    #[arg(long, value_name = "PATH", default_value = "Assetflow.toml")]
    pub config: String,

    /// Level for assetflow's own log events (error, warn, info, debug, trace).
    ///
    /// Applied on top of the `ASSETFLOW_LOG` directives.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve config, print paths and the task graph, run nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Print registered task names and exit.
    #[arg(long)]
    pub list: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
