// src/config/mod.rs

//! Configuration loading and validation for assetdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`), including the built-in
//!   pipeline layout.
//! - Load a config from disk or from the built-in default (`loader.rs`).
//! - Validate invariants like build-graph correctness (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_default, load_from_path, load_from_str};
pub use model::{
    ConfigFile, ConfigSection, RawConfigFile, ReloadSection, ServerSection, UnitConfig,
    DEFAULT_CONFIG,
};
