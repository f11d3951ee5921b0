// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{ConfigFile, RawConfigFile, DEFAULT_CONFIG};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for
/// semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Parse and validate a configuration held in memory.
pub fn load_from_str(contents: &str) -> Result<ConfigFile> {
    let raw: RawConfigFile = toml::from_str(contents)?;
    ConfigFile::try_from(raw)
}

/// Load a configuration file from path and validate it.
///
/// This is the entry point the rest of the application uses when a
/// `--config` path is given.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    ConfigFile::try_from(raw_config)
}

/// The built-in pipeline (`src/` → `public/`).
pub fn load_default() -> Result<ConfigFile> {
    load_from_str(DEFAULT_CONFIG)
}
