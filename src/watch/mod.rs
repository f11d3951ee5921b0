// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling `src` / `exclude` glob patterns per watched unit, plus the
//!   `[reload]` output patterns.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//!
//! It does **not** know about the build graph; it only turns filesystem
//! changes into unit-level triggers and output-change notifications.

pub mod event_handler;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use event_handler::events_for_path;
pub use patterns::{
    build_globset, build_profiles_from_config, collect_matching_files, OutputProfile,
    UnitWatchProfile, WatchBindings,
};
pub use watcher::{spawn_watcher, WatcherHandle};
