// src/engine/mod.rs

//! Orchestration engine for assetdag.
//!
//! This module ties together:
//! - the build-graph scheduler
//! - the trigger queue (what happens when a unit is re-triggered while it
//!   is still part of an active run)
//! - the main runtime event loop that reacts to:
//!   - the initial build seeding
//!   - file-watch triggers and output-change notifications
//!   - unit completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::path::PathBuf;

/// Canonical unit name type used throughout the engine.
pub type TaskName = String;

/// Outcome of one unit invocation, as seen by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Outputs were written (or were already up to date).
    Success,
    /// A source file did not compile. The unit wrote nothing but the run
    /// continues as if it had finished.
    SourceError,
    /// Filesystem or cleanup failure. Waiting dependents are failed too.
    Failed,
}

impl TaskOutcome {
    pub fn is_failure(self) -> bool {
        matches!(self, TaskOutcome::Failed)
    }
}

/// Why a unit was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Seeded by the initial build.
    Manual,
    /// Triggered due to a filesystem event.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit once the initial build is idle instead of arming the
    /// watcher (used for `--once` and the `templates` command).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the watcher, executors, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A unit should be run.
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    /// A unit invocation finished.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// An already generated output file changed on disk.
    OutputChanged { path: PathBuf },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::{CoreRuntime, Phase};
pub use event_handlers::{CoreCommand, CoreStep, ExitReason};
pub use queue::TriggerQueue;
pub use runtime::{NoWatch, Runtime, WatchHooks};
