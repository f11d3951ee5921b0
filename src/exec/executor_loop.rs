// src/exec/executor_loop.rs

//! Background loop that starts unit invocations.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::fs::FileSystem;
use crate::exec::task_runner::run_unit;
use crate::transform::UnitRegistry;

/// Spawn the background executor loop.
///
/// Each scheduled unit runs in its own Tokio task. Invocations are never
/// cancelled and nothing serialises them: the scheduler only dispatches a
/// unit again after its previous invocation in the run has completed.
pub fn spawn_executor(
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    registry: UnitRegistry,
    fs: Arc<dyn FileSystem>,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        while let Some(task) = rx.recv().await {
            let Some(unit) = registry.get(&task.name) else {
                warn!(unit = %task.name, "no transform registered for unit");
                let _ = runtime_tx
                    .send(RuntimeEvent::TaskCompleted {
                        task: task.name,
                        outcome: TaskOutcome::Failed,
                    })
                    .await;
                continue;
            };

            let rt_tx = runtime_tx.clone();
            let fs = Arc::clone(&fs);
            let name = task.name.clone();
            tokio::spawn(async move {
                run_unit(task, unit, fs, rt_tx).await;
                debug!(unit = %name, "unit runner future finished");
            });
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}
