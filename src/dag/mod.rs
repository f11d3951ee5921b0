// src/dag/mod.rs

//! Build graph representation and scheduling.
//!
//! - [`graph`] holds the directed acyclic graph of units.
//! - [`scheduler`] contains the per-run state machine that decides
//!   which units are ready to run, and when dependents can be scheduled.
//! - [`task_info`] provides unit metadata and scheduled unit types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::DagGraph;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskRunState};
