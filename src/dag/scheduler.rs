use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};
use crate::types::NotifyKind;

/// Scheduler holds the immutable build graph plus mutable per-run state.
///
/// It is responsible for:
/// - remembering which units are part of the current run
/// - deciding when a triggered unit is ready (co-scheduled deps finished)
/// - marking units as finished or failed
/// - failing waiting dependents when a unit fails
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: BTreeMap<TaskName, TaskInfo>,
    run_counter: u64,
    current_run_id: Option<u64>,
}

impl Scheduler {
    /// Construct a scheduler from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let graph = DagGraph::from_config(cfg);

        let tasks = cfg
            .units()
            .iter()
            .map(|(name, unit)| {
                let deps = graph.dependencies_of(name).to_vec();
                (name.clone(), TaskInfo::from_config(name.clone(), unit, deps))
            })
            .collect();

        Self {
            graph,
            tasks,
            run_counter: 0,
            current_run_id: None,
        }
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Notification policy of a unit, if it has one.
    pub fn notify_kind_of(&self, task: &str) -> Option<NotifyKind> {
        self.tasks.get(task).and_then(|info| info.notify)
    }

    /// Names of units participating in the active run (empty when idle).
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        if self.current_run_id.is_none() {
            return Vec::new();
        }

        self.tasks
            .values()
            .filter(|info| info.run_state.is_some())
            .map(|info| info.name.clone())
            .collect()
    }

    /// Whether the dependencies of `task` are satisfied for the current run.
    ///
    /// Returns `None` if the unit is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        Some(ReadOnlyStateManager::new(&self.tasks).deps_satisfied_for_info(info))
    }

    /// Start a new run, resetting per-run state but keeping history.
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);

        for info in self.tasks.values_mut() {
            info.run_state = None;
        }

        debug!(run_id = self.run_counter, "scheduler: starting new run");
    }

    pub fn handle_trigger(&mut self, task: &str) -> Vec<ScheduledTask> {
        self.trigger_step_internal(&[task]).newly_scheduled
    }

    /// Trigger several units at once.
    ///
    /// All of them are marked pending before readiness is evaluated, so the
    /// order of `tasks` does not matter for dependency ordering.
    pub fn handle_triggers(&mut self, tasks: &[&str]) -> Vec<ScheduledTask> {
        self.trigger_step_internal(tasks).newly_scheduled
    }

    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        self.completion_step_internal(task, outcome).newly_scheduled
    }

    /// Manual-step variant of `handle_trigger` that returns a rich [`SchedulerStep`].
    pub fn step_trigger(&mut self, task: &str) -> SchedulerStep {
        self.trigger_step_internal(&[task])
    }

    /// Manual-step variant of `handle_completion` that returns a rich [`SchedulerStep`].
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        self.completion_step_internal(task, outcome)
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.graph.tasks()
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// Clear `current_run_id` if every unit is terminal.
    ///
    /// Returns `true` if this call transitioned the scheduler to idle.
    fn maybe_finish_run(&mut self) -> bool {
        if self.current_run_id.is_none() {
            return false;
        }

        let manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);

        if manager.all_tasks_terminal() {
            info!(run_id = self.current_run_id, "run finished");
            self.current_run_id = None;
            true
        } else {
            false
        }
    }

    fn trigger_step_internal(&mut self, tasks: &[&str]) -> SchedulerStep {
        if self.current_run_id.is_none() {
            warn!(
                units = ?tasks,
                "trigger with no active run; implicitly starting a new run"
            );
            self.start_new_run();
        }

        let (known, unknown): (Vec<&str>, Vec<&str>) = tasks
            .iter()
            .copied()
            .partition(|task| self.tasks.contains_key(*task));
        for task in unknown {
            warn!(unit = %task, "trigger for unknown unit; ignoring");
        }

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        for task in known {
            manager.mark_task_pending(task);
        }

        let newly_scheduled = manager.collect_new_ready_tasks();
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_failed: Vec::new(),
            run_just_finished,
        }
    }

    fn completion_step_internal(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.current_run_id else {
            warn!(unit = %task, "completion with no active run; ignoring");
            return SchedulerStep::default();
        };

        let mut newly_scheduled = Vec::new();
        let mut newly_failed = Vec::new();

        let Some(info) = self.tasks.get_mut(task) else {
            warn!(unit = %task, "completion for unknown unit; ignoring");
            return SchedulerStep::default();
        };

        if outcome.is_failure() {
            info.run_state = Some(RunState::DoneFailed);
            info.last_failed_run = Some(run_id);
            warn!(
                unit = %task,
                run_id,
                "unit failed; failing waiting dependents in this run"
            );
            newly_failed.push(task.to_string());
            let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
            newly_failed.extend(manager.mark_dependents_failed(task));
        } else {
            info.run_state = Some(RunState::DoneSuccess);
            info.last_successful_run = Some(run_id);
            debug!(unit = %task, run_id, ?outcome, "unit finished");
            let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
            newly_scheduled.extend(manager.collect_new_ready_tasks());
        }

        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_failed,
            run_just_finished,
        }
    }
}
