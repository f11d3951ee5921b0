// src/dag/task_info.rs

//! Unit metadata and per-run state.

use crate::config::UnitConfig;
use crate::engine::TaskName;
use crate::types::{NotifyKind, UnitKind};

/// Per-run state of a unit (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Triggered for this run, waiting on dependencies.
    Pending,
    /// Dispatched to the executor.
    Running,
    /// Finished for this run. Source errors land here too: the unit
    /// reported them and produced nothing, which does not block ordering.
    DoneSuccess,
    /// Failed in this run, or blocked by a failed dependency.
    DoneFailed,
}

/// Public, read-only view of a unit's per-run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
        }
    }
}

/// Static unit information derived from config, plus per-run state.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    pub kind: UnitKind,
    pub notify: Option<NotifyKind>,
    /// Direct dependencies (`after = [...]`).
    pub deps: Vec<TaskName>,

    /// None if not participating in the current run.
    pub run_state: Option<RunState>,

    pub last_successful_run: Option<u64>,
    pub last_failed_run: Option<u64>,
}

impl TaskInfo {
    pub fn from_config(name: TaskName, cfg: &UnitConfig, deps: Vec<TaskName>) -> Self {
        Self {
            name,
            kind: cfg.kind,
            notify: cfg.effective_notify(),
            deps,
            run_state: None,
            last_successful_run: None,
            last_failed_run: None,
        }
    }
}

/// A unit the scheduler wants the executor to run now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub kind: UnitKind,
    /// All units dispatched within the same run share this id.
    pub run_id: u64,
}

impl ScheduledTask {
    pub fn from_task_info(info: &TaskInfo, run_id: u64) -> Self {
        Self {
            name: info.name.clone(),
            kind: info.kind,
            run_id,
        }
    }
}
