// src/exec/task_runner.rs

//! Individual unit runner.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::errors::UnitError;
use crate::fs::FileSystem;
use crate::transform::{TransformUnit, UnitReport};

/// Map a unit result to what the scheduler needs to know.
pub fn outcome_of(result: &Result<UnitReport, UnitError>) -> TaskOutcome {
    match result {
        Ok(_) => TaskOutcome::Success,
        Err(UnitError::Source { .. }) => TaskOutcome::SourceError,
        Err(UnitError::Fs(_)) => TaskOutcome::Failed,
    }
}

/// Run one unit on the blocking pool and send `TaskCompleted`.
///
/// Errors stay local: they are logged here and only the outcome travels on.
pub async fn run_unit(
    task: ScheduledTask,
    unit: Arc<dyn TransformUnit>,
    fs: Arc<dyn FileSystem>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let started = Instant::now();
    info!(unit = %task.name, kind = %task.kind, run_id = task.run_id, "starting unit");

    let joined = tokio::task::spawn_blocking(move || unit.run(fs.as_ref())).await;

    let outcome = match joined {
        Ok(result) => {
            let outcome = outcome_of(&result);
            match result {
                Ok(report) => info!(
                    unit = %task.name,
                    run_id = task.run_id,
                    files = report.files,
                    bytes = report.bytes,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "finished: {report}"
                ),
                Err(UnitError::Source { path, message }) => warn!(
                    unit = %task.name,
                    run_id = task.run_id,
                    path = %path.display(),
                    "source error: {message}"
                ),
                Err(UnitError::Fs(err)) => error!(
                    unit = %task.name,
                    run_id = task.run_id,
                    "unit failed: {err:#}"
                ),
            }
            outcome
        }
        Err(join_err) => {
            error!(unit = %task.name, run_id = task.run_id, error = %join_err, "unit panicked");
            TaskOutcome::Failed
        }
    };

    if let Err(err) = runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
        })
        .await
    {
        warn!(unit = %task.name, "failed to send TaskCompleted to runtime: {err}");
    }
}
