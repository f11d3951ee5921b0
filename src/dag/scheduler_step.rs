// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task_info::ScheduledTask;
use crate::engine::TaskName;

/// Structured result of a single scheduler "step".
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Units that became ready to run as a result of this step.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Units newly marked as failed in this step (the failing unit plus any
    /// dependents in the same run).
    pub newly_failed: Vec<TaskName>,
    /// Whether this step finished the current run.
    pub run_just_finished: bool,
}
