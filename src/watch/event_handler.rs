// src/watch/event_handler.rs

//! Event processing logic for file system changes.

use std::path::Path;

use notify::EventKind;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchBindings;

/// Whether a notify event kind can change what a unit would produce.
pub fn is_relevant_kind(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    )
}

/// Map one changed path to the runtime events it causes.
///
/// Every bound unit whose patterns match gets its own trigger; a match on
/// the `[reload]` output patterns adds an `OutputChanged`.
pub fn events_for_path(root: &Path, path: &Path, bindings: &WatchBindings) -> Vec<RuntimeEvent> {
    let Some(rel) = relative_str(root, path) else {
        warn!(
            "could not relativize path {:?} against root {:?}",
            path, root
        );
        return Vec::new();
    };

    let mut events: Vec<RuntimeEvent> = bindings
        .units_for(&rel)
        .into_iter()
        .map(|name| RuntimeEvent::TaskTriggered {
            task: name.to_string(),
            reason: TriggerReason::FileWatch,
        })
        .collect();

    if bindings.is_output(&rel) {
        events.push(RuntimeEvent::OutputChanged {
            path: path.to_path_buf(),
        });
    }

    if !events.is_empty() {
        debug!(rel = %rel, count = events.len(), "watch match");
    }

    events
}

/// Forward the events for `path` to the runtime.
///
/// Returns `false` once the runtime channel is closed.
pub async fn process_file_change(
    root: &Path,
    path: &Path,
    bindings: &WatchBindings,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    for event in events_for_path(root, path, bindings) {
        if let Err(err) = runtime_tx.send(event).await {
            warn!("failed to forward watch event to runtime: {err}");
            return false;
        }
    }
    true
}
