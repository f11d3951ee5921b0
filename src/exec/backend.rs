// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw mpsc sender,
//! so tests can swap in a fake executor that records dispatches and emits
//! `TaskCompleted` events directly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::transform::UnitRegistry;

use super::executor_loop::spawn_executor;

/// Trait abstracting how scheduled units are executed.
pub trait ExecutorBackend: Send {
    /// Dispatch the given units for execution.
    ///
    /// Implementations report each unit's completion back to the runtime as
    /// a `RuntimeEvent::TaskCompleted`.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
///
/// Forwards scheduled units to the background loop started by
/// [`spawn_executor`].
pub struct RealExecutorBackend {
    tx: mpsc::Sender<ScheduledTask>,
}

impl RealExecutorBackend {
    /// Spawns the background executor loop immediately.
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        registry: UnitRegistry,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let tx = spawn_executor(runtime_tx, registry, fs);
        Self { tx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for task in tasks {
                tx.send(task)
                    .await
                    .map_err(|e| anyhow!("executor loop is gone: {e}"))?;
            }
            Ok(())
        })
    }
}
