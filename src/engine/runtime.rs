// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::errors::{AssetdagError, Result};
use crate::exec::ExecutorBackend;
use crate::types::NotifyKind;

use super::core::CoreRuntime;
use super::{CoreCommand, ExitReason, RuntimeEvent, TaskName};

/// Side effects of the watch phase, driven by the runtime.
///
/// Production code starts the dev server and the file watcher here; tests
/// record the calls instead.
pub trait WatchHooks: Send {
    /// The initial build finished: arm the watcher, start serving.
    fn start_watching(&mut self) -> anyhow::Result<()>;

    /// Tell connected clients about a change. Best effort.
    fn notify(&mut self, kind: NotifyKind);

    /// The runtime is exiting.
    fn shutdown(&mut self) {}
}

/// Hooks that do nothing, for runs that never watch.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWatch;

impl WatchHooks for NoWatch {
    fn start_watching(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn notify(&mut self, _kind: NotifyKind) {}
}

/// Drives the scheduler in response to `RuntimeEvent`s and delegates unit
/// execution to an `ExecutorBackend` and watch-phase effects to
/// [`WatchHooks`].
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics.
pub struct Runtime<E: ExecutorBackend, H: WatchHooks> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    hooks: H,
}

impl<E: ExecutorBackend, H: WatchHooks> fmt::Debug for Runtime<E, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend, H: WatchHooks> Runtime<E, H> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        hooks: H,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            hooks,
        }
    }

    /// Run the initial build seeded with `roots`, then keep reacting to
    /// events until the core asks to stop, the channel closes or a shutdown
    /// is requested.
    ///
    /// Returns `BuildFailed` if units failed during the initial build.
    pub async fn run(mut self, roots: Vec<TaskName>) -> Result<()> {
        info!("assetdag runtime started");

        let mut exit = None;
        let step = self.core.start(roots);
        let mut keep_running = step.keep_running;
        for command in step.commands {
            if let Some(reason) = self.execute_command(command).await? {
                exit = Some(reason);
            }
        }

        while keep_running {
            let Some(event) = self.event_rx.recv().await else {
                info!("runtime event channel closed; exiting");
                break;
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                if let Some(reason) = self.execute_command(command).await? {
                    exit = Some(reason);
                }
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                keep_running = false;
            }
        }

        self.hooks.shutdown();
        info!("runtime exiting");

        match exit {
            Some(ExitReason::BuildFailed(units)) => Err(AssetdagError::BuildFailed(units)),
            _ => Ok(()),
        }
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<Option<ExitReason>> {
        match command {
            CoreCommand::DispatchTasks(tasks) => {
                self.spawn_ready(tasks).await?;
            }
            CoreCommand::Notify(kind) => {
                debug!(?kind, "notifying clients");
                self.hooks.notify(kind);
            }
            CoreCommand::StartWatching => {
                self.hooks.start_watching()?;
            }
            CoreCommand::RequestExit(reason) => {
                info!(?reason, "core issued RequestExit command");
                return Ok(Some(reason));
            }
        }
        Ok(None)
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        let run_ids: Vec<_> = tasks.iter().map(|t| t.run_id).collect();
        debug!(?names, ?run_ids, "spawning ready units");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
