use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use assetdag::dag::ScheduledTask;
use assetdag::engine::{RuntimeEvent, TaskOutcome, WatchHooks};
use assetdag::errors::Result;
use assetdag::exec::ExecutorBackend;
use assetdag::types::NotifyKind;

/// A fake executor that:
/// - records which units were "run"
/// - immediately reports TaskCompleted for each scheduled unit, with
///   `Success` unless an outcome was configured for it.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    outcomes: BTreeMap<String, TaskOutcome>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            outcomes: BTreeMap::new(),
        }
    }

    pub fn with_outcome(mut self, unit: &str, outcome: TaskOutcome) -> Self {
        self.outcomes.insert(unit.to_string(), outcome);
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let outcomes = self.outcomes.clone();

        Box::pin(async move {
            for t in tasks {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(t.name.clone());
                }

                let outcome = outcomes.get(&t.name).copied().unwrap_or(TaskOutcome::Success);
                tx.send(RuntimeEvent::TaskCompleted {
                    task: t.name.clone(),
                    outcome,
                })
                .await.map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}

/// An executor that runs each unit on its own tokio task, sleeping for a
/// per-unit delay, and logs `start:<unit>` / `done:<unit>`.
///
/// Used to check that independent units overlap and that dependents only
/// start after every dependency is done.
pub struct DelayedExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    log: Arc<Mutex<Vec<String>>>,
    delays: BTreeMap<String, Duration>,
}

impl DelayedExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            runtime_tx,
            log,
            delays: BTreeMap::new(),
        }
    }

    pub fn with_delay(mut self, unit: &str, delay: Duration) -> Self {
        self.delays.insert(unit.to_string(), delay);
        self
    }
}

impl ExecutorBackend for DelayedExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        for t in tasks {
            let tx = self.runtime_tx.clone();
            let log = Arc::clone(&self.log);
            let delay = self.delays.get(&t.name).copied().unwrap_or_default();

            tokio::spawn(async move {
                log.lock().unwrap().push(format!("start:{}", t.name));
                tokio::time::sleep(delay).await;
                log.lock().unwrap().push(format!("done:{}", t.name));
                let _ = tx
                    .send(RuntimeEvent::TaskCompleted {
                        task: t.name,
                        outcome: TaskOutcome::Success,
                    })
                    .await;
            });
        }
        Box::pin(async { Ok(()) })
    }
}

/// What the runtime asked the watch session to do.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HookLog {
    pub started: usize,
    pub notified: Vec<NotifyKind>,
    pub shut_down: bool,
}

/// `WatchHooks` that records calls instead of serving or watching.
#[derive(Debug, Default, Clone)]
pub struct RecordingHooks {
    log: Arc<Mutex<HookLog>>,
    started: Arc<tokio::sync::Notify>,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> HookLog {
        self.log.lock().unwrap().clone()
    }

    /// Resolves once `start_watching` has been called.
    pub async fn wait_started(&self) {
        if self.log.lock().unwrap().started > 0 {
            return;
        }
        self.started.notified().await;
    }
}

impl WatchHooks for RecordingHooks {
    fn start_watching(&mut self) -> anyhow::Result<()> {
        self.log.lock().unwrap().started += 1;
        self.started.notify_one();
        Ok(())
    }

    fn notify(&mut self, kind: NotifyKind) {
        self.log.lock().unwrap().notified.push(kind);
    }

    fn shutdown(&mut self) {
        self.log.lock().unwrap().shut_down = true;
    }
}
