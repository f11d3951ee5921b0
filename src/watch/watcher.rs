// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::watch::event_handler::{is_relevant_kind, process_file_change};
use crate::watch::patterns::WatchBindings;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive; dropping the handle stops
/// file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `root` recursively and turn matching changes into
/// `TaskTriggered` / `OutputChanged` events for the runtime.
///
/// Events are forwarded one by one as notify reports them; nothing is
/// batched or debounced.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    bindings: WatchBindings,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    warn!("failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                warn!("file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!(
        units = bindings.units.len(),
        "file watcher started on {:?}", root
    );

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if !is_relevant_kind(&event.kind) {
                continue;
            }
            debug!(?event, "received notify event");

            for path in &event.paths {
                if !process_file_change(&root, path, &bindings, &runtime_tx).await {
                    debug!("runtime channel closed; stopping watcher loop");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
