// src/logging.rs

//! Logging setup: `tracing` events formatted to stderr.
//!
//! `ASSETFLOW_LOG` takes full filter directives (`debug`,
//! `assetflow::watch=trace,notify=debug`). `--log-level` overrides the level
//! of assetflow's own events and keeps any per-target directives from the
//! environment. Dependencies log at `warn` unless a directive says otherwise.
//! stdout is left to `--list` / `--dry-run`.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "ASSETFLOW_LOG";

const DEFAULT_DIRECTIVES: &str = "warn,assetflow=info";

/// Initialise the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = build_filter(cli_level, env.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))
}

/// Combine the CLI level and `ASSETFLOW_LOG` into one filter.
///
/// Invalid directives are an error rather than being silently dropped.
pub fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    let mut directives = match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(env) => env.to_string(),
        None => DEFAULT_DIRECTIVES.to_string(),
    };
    if let Some(level) = cli_level {
        directives.push_str(",assetflow=");
        directives.push_str(level.as_str());
    }

    EnvFilter::try_new(&directives).with_context(|| format!("invalid {LOG_ENV} directives '{directives}'"))
}
