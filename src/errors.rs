// src/errors.rs

//! Crate-wide error types.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    #[error("Cycle detected in build graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("build failed in unit(s): {}", .0.join(", "))]
    BuildFailed(Vec<String>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure of a single transform unit invocation.
///
/// Errors never leave the unit that raised them; the executor turns them
/// into a `TaskOutcome` and logs them.
#[derive(Error, Debug)]
pub enum UnitError {
    /// Malformed source input. Reported, nothing written, process continues.
    #[error("{}: {message}", path.display())]
    Source { path: PathBuf, message: String },

    /// Missing directories, permission errors, failed writes.
    #[error(transparent)]
    Fs(#[from] anyhow::Error),
}

impl UnitError {
    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        UnitError::Source {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetdagError>;
