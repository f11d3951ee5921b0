// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use crate::engine::TaskName;
use crate::types::TriggerWhileRunningBehaviour;

/// Triggers for units that were already part of the active run.
///
/// Semantics:
/// - Each queued entry is a *batch* of unit names that become the triggers
///   of one future run.
/// - `queue_length` (max_runs) caps how many future runs are kept. A trigger
///   for a unit that is already in the newest batch opens a new batch; once
///   the cap is reached, further triggers are coalesced into the newest one.
/// - When the scheduler goes idle the runtime calls [`TriggerQueue::next_batch`]
///   and starts a run from the oldest batch.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    runs: VecDeque<BTreeSet<TaskName>>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    /// Record that `task` was triggered while it is still part of the
    /// active run.
    ///
    /// - `Queue`: append to the newest batch, or open a new batch when the
    ///   unit is already waiting there and the cap allows it.
    /// - `Cancel`: forget everything queued and keep only this unit.
    ///   Running units are never interrupted.
    pub fn record_trigger(&mut self, task: &str) {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                let needs_new_batch = match self.runs.back() {
                    None => true,
                    Some(last) => last.contains(task) && self.runs.len() < self.max_runs,
                };

                if needs_new_batch {
                    self.runs.push_back(BTreeSet::from([task.to_string()]));
                    debug!(unit = %task, batches = self.runs.len(), "queued trigger in new batch");
                } else if let Some(last) = self.runs.back_mut() {
                    let inserted = last.insert(task.to_string());
                    debug!(unit = %task, inserted, "merged trigger into newest batch");
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                debug!(unit = %task, "replacing queued triggers with this unit (cancel mode)");
                self.runs.clear();
                self.runs.push_back(BTreeSet::from([task.to_string()]));
            }
        }
    }

    /// Pop the oldest queued batch.
    pub fn next_batch(&mut self) -> Vec<TaskName> {
        let batch: Vec<TaskName> = self
            .runs
            .pop_front()
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();
        if !batch.is_empty() {
            debug!(units = ?batch, remaining = self.runs.len(), "took queued batch for new run");
        }
        batch
    }
}

