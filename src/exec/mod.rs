// src/exec/mod.rs

//! Unit execution layer.
//!
//! This module runs the transform units the scheduler dispatches and reports
//! back to the orchestration runtime via `RuntimeEvent`s.
//!
//! - [`executor_loop`] owns the background loop that receives scheduled
//!   units and spawns one Tokio task per invocation.
//! - [`task_runner`] runs a single unit and maps its result to a
//!   `TaskOutcome`.
//! - [`backend`] provides the `ExecutorBackend` trait and the concrete
//!   `RealExecutorBackend` used in production, which tests replace with a
//!   fake implementation.

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;
