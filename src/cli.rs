// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `assetdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetdag",
    version,
    about = "Build src/ into public/, then rebuild on change and live-reload the browser.",
    long_about = None
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Pipeline definition (TOML). Without it the built-in `src/` → `public/`
    /// layout is used.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Build once and exit instead of watching.
    #[arg(long, global = true)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the build graph and watch bindings, but don't
    /// run any unit.
    #[arg(long, global = true)]
    pub dry_run: bool,
}

impl CliArgs {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Build)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Full build, then watch and serve (default).
    Build,
    /// Render the template units once and exit.
    Templates,
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

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
