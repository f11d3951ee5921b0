// src/dag/state_manager.rs

//! Per-run state management for units in the scheduler.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::dag::DagGraph;
use crate::engine::TaskName;

/// Manages per-run state transitions for units.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut BTreeMap<TaskName, TaskInfo>,
    current_run_id: Option<u64>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut BTreeMap<TaskName, TaskInfo>,
        current_run_id: Option<u64>,
    ) -> Self {
        Self {
            graph,
            tasks,
            current_run_id,
        }
    }

    /// Include a triggered unit in this run.
    ///
    /// Dependents are not pulled in: a change to one unit's sources re-runs
    /// exactly that unit. Units already in the run keep their state.
    pub fn mark_task_pending(&mut self, name: &str) {
        let failed_deps: Vec<TaskName> = self
            .graph
            .dependencies_of(name)
            .iter()
            .filter(|dep| {
                self.tasks
                    .get(dep.as_str())
                    .is_some_and(|d| d.run_state == Some(RunState::DoneFailed))
            })
            .cloned()
            .collect();

        match self.tasks.get_mut(name) {
            Some(info) if info.run_state.is_none() => {
                info.run_state = Some(RunState::Pending);
                debug!(unit = %info.name, "marked Pending for this run");
                if !failed_deps.is_empty() {
                    info!(
                        unit = %info.name,
                        failed = ?failed_deps,
                        "dependency already failed in this run; not waiting on it"
                    );
                }
            }
            Some(_) => {}
            None => warn!(unit = %name, "node in graph not present in units map"),
        }
    }

    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        ReadOnlyStateManager::new(self.tasks).deps_satisfied_for_info(info)
    }

    /// Mark every dependent of a failed unit that is still waiting in this
    /// run (transitively) as `DoneFailed`.
    ///
    /// Returns the newly failed units, excluding `failed_task` itself.
    pub fn mark_dependents_failed(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();
        let mut newly_failed = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&name) {
                if info.run_state == Some(RunState::Pending) {
                    info.run_state = Some(RunState::DoneFailed);
                    debug!(
                        unit = %info.name,
                        "marking dependent as DoneFailed due to upstream failure"
                    );
                    newly_failed.push(info.name.clone());
                    stack.extend(self.graph.dependents_of(&name).iter().cloned());
                }
            }
        }

        newly_failed
    }

    /// Collect `Pending` units whose dependencies are satisfied, mark them
    /// `Running` and return them for dispatch.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let candidates: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| {
                info.run_state == Some(RunState::Pending) && self.deps_satisfied_for_info(info)
            })
            .map(|info| info.name.clone())
            .collect();

        let run_id = self.current_run_id.unwrap_or(0);
        let mut ready = Vec::with_capacity(candidates.len());

        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                let is_rerun = info.last_successful_run.is_some() || info.last_failed_run.is_some();
                if is_rerun {
                    info!(unit = %info.name, run_id, "re-running unit");
                } else {
                    info!(unit = %info.name, run_id, "running unit");
                }

                info.run_state = Some(RunState::Running);
                ready.push(ScheduledTask::from_task_info(info, run_id));
            }
        }

        ready
    }

    pub fn all_tasks_terminal(&self) -> bool {
        !self.tasks.values().any(|info| {
            matches!(
                info.run_state,
                Some(RunState::Pending) | Some(RunState::Running)
            )
        })
    }
}

/// Read-only view used where only shared access to the units map exists.
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a BTreeMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a BTreeMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    /// Whether all dependencies of `info` allow it to start in the current run.
    ///
    /// Ordering only binds units that take part in the same run: a
    /// dependency that is not in the run does not hold the unit back.
    ///
    /// A failed dependency is finished too. Units that were waiting on it
    /// were failed along with it, so a unit that is still `Pending` here
    /// joined the run afterwards and builds on whatever output is on disk.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep_name| {
            let Some(dep) = self.tasks.get(dep_name) else {
                warn!(
                    unit = %info.name,
                    dep = %dep_name,
                    "dependency missing from units map"
                );
                return false;
            };

            match dep.run_state {
                Some(RunState::DoneSuccess) | Some(RunState::DoneFailed) | None => true,
                Some(RunState::Pending) | Some(RunState::Running) => false,
            }
        })
    }
}
