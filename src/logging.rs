// src/logging.rs

//! Logging setup for `assetdag` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `ASSETDAG_LOG` environment variable, as an `EnvFilter` directive
//!    string (e.g. "debug" or "assetdag::watch=trace,info")
//! 3. default to `info`
//!
//! Logs go to STDERR; stdout is reserved for `--dry-run` output.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "ASSETDAG_LOG";

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(lvl) => EnvFilter::new(directive_for(lvl)),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("initialising logging: {e}"))
}

fn directive_for(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
