// src/session.rs

//! Process-scoped resources of the watch phase.

use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::engine::{RuntimeEvent, WatchHooks};
use crate::server::{DevServer, DevServerHandle, ReloadHub};
use crate::types::NotifyKind;
use crate::watch::{build_profiles_from_config, spawn_watcher, WatcherHandle};

/// Owns the dev server and the file watcher once watching starts.
///
/// Nothing runs until [`WatchHooks::start_watching`]; both resources are
/// released on [`WatchHooks::shutdown`] or drop.
#[derive(Debug)]
pub struct Session {
    config: ConfigFile,
    root: PathBuf,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    hub: ReloadHub,
    server: Option<DevServerHandle>,
    watcher: Option<WatcherHandle>,
}

impl Session {
    pub fn new(config: ConfigFile, root: PathBuf, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            config,
            root,
            runtime_tx,
            hub: ReloadHub::new(),
            server: None,
            watcher: None,
        }
    }

    pub fn hub(&self) -> &ReloadHub {
        &self.hub
    }

    pub fn server(&self) -> Option<&DevServerHandle> {
        self.server.as_ref()
    }
}

impl WatchHooks for Session {
    fn start_watching(&mut self) -> Result<()> {
        if self.config.server().enabled {
            let handle = DevServer::start(self.config.server(), &self.root, self.hub.clone())?;
            self.server = Some(handle);
        } else {
            debug!("dev server disabled");
        }

        let bindings = build_profiles_from_config(&self.config)?;
        let watcher = spawn_watcher(self.root.clone(), bindings, self.runtime_tx.clone())?;
        self.watcher = Some(watcher);
        info!("watching for changes (Ctrl-C to stop)");
        Ok(())
    }

    fn notify(&mut self, kind: NotifyKind) {
        if self.server.is_some() {
            self.hub.notify_in_background(kind);
        }
    }

    fn shutdown(&mut self) {
        self.watcher = None;
        if let Some(mut server) = self.server.take() {
            server.stop();
        }
    }
}
