// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::dag::{ScheduledTask, Scheduler, TaskRunState};
use crate::engine::queue::TriggerQueue;
use crate::engine::{TaskName, TaskOutcome, TriggerReason};
use crate::types::NotifyKind;

/// Why the core asked the shell to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The initial build finished and nothing is left to do.
    Completed,
    /// The initial build had units that failed (including dependents that
    /// never ran because of them).
    BuildFailed(Vec<TaskName>),
}

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreCommand {
    /// Send these units to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Tell connected clients to reload or re-inject styles.
    Notify(NotifyKind),
    /// The initial build is done: start the dev server and the watcher.
    StartWatching,
    /// Stop the runtime.
    RequestExit(ExitReason),
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle a unit trigger.
///
/// - Idle scheduler: start a new run seeded with this trigger plus the
///   oldest queued batch.
/// - Active run, unit not part of it: merge it into the run right away, so
///   unrelated units run concurrently.
/// - Active run, unit already in it: record it in the queue for a later run.
pub fn handle_task_trigger(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    task: TaskName,
    reason: TriggerReason,
) -> Vec<CoreCommand> {
    debug!(unit = %task, ?reason, "unit triggered");

    if scheduler.is_idle() {
        let mut triggers: BTreeSet<TaskName> = queue.next_batch().into_iter().collect();
        triggers.insert(task);
        return start_new_run_from_triggers(scheduler, triggers.into_iter().collect());
    }

    let mut commands = Vec::new();
    match scheduler.run_state_of(&task) {
        None => {
            warn!(unit = %task, "trigger for unknown unit; ignoring");
        }
        Some(TaskRunState::NotInRun) => {
            let newly_ready = scheduler.handle_trigger(&task);
            if !newly_ready.is_empty() {
                commands.push(CoreCommand::DispatchTasks(newly_ready));
            }
        }
        Some(_already_in_run) => {
            queue.record_trigger(&task);
        }
    }
    commands
}

/// Outcome of applying one completion to the scheduler.
#[derive(Debug, Default)]
pub struct CompletionEffects {
    pub commands: Vec<CoreCommand>,
    /// Units that became `DoneFailed` through this completion.
    pub failed: Vec<TaskName>,
    /// Whether the run this unit belonged to is now finished.
    pub run_finished: bool,
}

/// Handle a unit completion.
///
/// `notify_clients` is false before the watcher is armed: there is no
/// dev server yet to notify.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    task: TaskName,
    outcome: TaskOutcome,
    notify_clients: bool,
) -> CompletionEffects {
    let mut commands = Vec::new();

    if scheduler.run_state_of(&task) != Some(TaskRunState::Running) {
        warn!(unit = %task, "completion for a unit that is not running; ignoring");
        return CompletionEffects::default();
    }

    match outcome {
        TaskOutcome::Success => {}
        TaskOutcome::SourceError => {
            warn!(unit = %task, "unit reported source errors; no new output this time");
        }
        TaskOutcome::Failed => {
            warn!(unit = %task, "unit failed");
        }
    }

    let step = scheduler.step_completion(&task, outcome);

    if notify_clients && outcome == TaskOutcome::Success {
        if let Some(kind) = scheduler.notify_kind_of(&task) {
            commands.push(CoreCommand::Notify(kind));
        }
    }

    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }

    if step.newly_failed.len() > 1 {
        info!(
            unit = %task,
            skipped = ?&step.newly_failed[1..],
            "dependents skipped after failure"
        );
    }

    CompletionEffects {
        commands,
        failed: step.newly_failed,
        run_finished: step.run_just_finished,
    }
}

/// Seed a new run from a set of triggers.
pub fn start_new_run_from_triggers(
    scheduler: &mut Scheduler,
    triggers: Vec<TaskName>,
) -> Vec<CoreCommand> {
    if triggers.is_empty() {
        return Vec::new();
    }

    scheduler.start_new_run();

    let names: Vec<&str> = triggers.iter().map(String::as_str).collect();
    let all_ready = scheduler.handle_triggers(&names);

    if all_ready.is_empty() {
        Vec::new()
    } else {
        vec![CoreCommand::DispatchTasks(all_ready)]
    }
}

/// If the scheduler is idle and a batch is queued, start a run from it.
pub fn maybe_start_queued_run(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
) -> Vec<CoreCommand> {
    if !scheduler.is_idle() {
        return Vec::new();
    }

    let triggers = queue.next_batch();
    start_new_run_from_triggers(scheduler, triggers)
}
