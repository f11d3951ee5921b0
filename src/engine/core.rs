// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! The core consumes [`RuntimeEvent`]s and produces an updated state plus a
//! list of [`CoreCommand`]s describing what the IO shell should do next.
//! It has no channels, no Tokio types and performs no IO, so the whole
//! build/watch lifecycle can be unit tested step by step.
//!
//! Lifecycle:
//! - [`Phase::Building`]: the initial build graph is running. Completions do
//!   not notify clients (no server yet). When the first run finishes the core
//!   emits `StartWatching`, or `RequestExit` if a unit failed or the runtime
//!   was asked to exit when idle.
//! - [`Phase::Watching`]: terminal for the process lifetime. Triggers run
//!   individual units, completions notify clients, output changes reload.

use tracing::{debug, info, warn};

use crate::dag::Scheduler;
use crate::engine::event_handlers::{
    handle_task_completion, handle_task_trigger, maybe_start_queued_run,
    start_new_run_from_triggers, CoreCommand, CoreStep, ExitReason,
};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions, TaskName, TaskOutcome};
use crate::types::{NotifyKind, TriggerWhileRunningBehaviour};

/// Lifecycle phase of the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Building,
    Watching,
}

/// Pure core runtime state.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    options: RuntimeOptions,
    phase: Phase,
    /// Units that failed during the initial build.
    initial_failures: Vec<TaskName>,
}

impl CoreRuntime {
    pub fn new(
        scheduler: Scheduler,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            scheduler,
            queue: TriggerQueue::new(behaviour, queue_length),
            options,
            phase: Phase::Building,
            initial_failures: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Expose whether the scheduler is idle (for tests).
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Expose queue emptiness (for tests).
    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Seed the initial build with `roots`.
    ///
    /// With no roots there is nothing to build, so the build phase ends
    /// immediately.
    pub fn start(&mut self, roots: Vec<TaskName>) -> CoreStep {
        info!(units = ?roots, "starting initial build");
        let commands = start_new_run_from_triggers(&mut self.scheduler, roots);

        if self.scheduler.is_idle() {
            return self.finish_build(commands);
        }

        CoreStep::continue_with(commands)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task, reason } => {
                let commands =
                    handle_task_trigger(&mut self.scheduler, &mut self.queue, task, reason);
                CoreStep::continue_with(commands)
            }
            RuntimeEvent::TaskCompleted { task, outcome } => self.on_completion(task, outcome),
            RuntimeEvent::OutputChanged { path } => {
                if self.phase == Phase::Watching {
                    debug!(path = %path.display(), "generated output changed; reloading clients");
                    CoreStep::continue_with(vec![CoreCommand::Notify(NotifyKind::Reload)])
                } else {
                    CoreStep::continue_with(Vec::new())
                }
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }

    fn on_completion(&mut self, task: TaskName, outcome: TaskOutcome) -> CoreStep {
        let watching = self.phase == Phase::Watching;
        let effects = handle_task_completion(&mut self.scheduler, task, outcome, watching);
        let mut commands = effects.commands;

        if watching {
            commands.extend(maybe_start_queued_run(&mut self.scheduler, &mut self.queue));
            return CoreStep::continue_with(commands);
        }

        self.initial_failures.extend(effects.failed);

        if effects.run_finished {
            // Triggers recorded during the initial build still get their run
            // before the build phase is considered over.
            commands.extend(maybe_start_queued_run(&mut self.scheduler, &mut self.queue));
            if self.scheduler.is_idle() {
                return self.finish_build(commands);
            }
        }

        CoreStep::continue_with(commands)
    }

    fn finish_build(&mut self, mut commands: Vec<CoreCommand>) -> CoreStep {
        if !self.initial_failures.is_empty() {
            warn!(units = ?self.initial_failures, "initial build failed");
            commands.push(CoreCommand::RequestExit(ExitReason::BuildFailed(
                std::mem::take(&mut self.initial_failures),
            )));
            return CoreStep {
                commands,
                keep_running: false,
            };
        }

        if self.options.exit_when_idle {
            info!("build finished");
            commands.push(CoreCommand::RequestExit(ExitReason::Completed));
            return CoreStep {
                commands,
                keep_running: false,
            };
        }

        info!("build finished; watching for changes");
        self.phase = Phase::Watching;
        commands.push(CoreCommand::StartWatching);
        CoreStep::continue_with(commands)
    }
}
