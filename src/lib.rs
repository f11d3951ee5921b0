// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod server;
pub mod session;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::{load_and_validate, load_default, ConfigFile};
use crate::dag::Scheduler;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TaskName};
use crate::errors::{AssetdagError, Result};
use crate::exec::RealExecutorBackend;
use crate::fs::{FileSystem, RealFileSystem};
use crate::session::Session;
use crate::transform::UnitRegistry;
use crate::types::UnitKind;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - transform units, scheduler, queue and runtime
/// - executor
/// - the watch session (dev server + file watcher, started after the
///   initial build)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let command = args.command();
    let (cfg, root) = load_config(args.config.as_deref())?;

    if args.dry_run {
        print_dry_run(&cfg, &root, command);
        return Ok(());
    }

    let roots = initial_units(&cfg, command)?;
    let registry = UnitRegistry::from_config(&cfg, &root)?;
    let scheduler = Scheduler::from_config(&cfg);

    let behaviour = cfg.config().triggered_while_running_behaviour;
    let queue_length = cfg.config().queue_length;

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let executor = RealExecutorBackend::new(rt_tx.clone(), registry, fs);

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let options = RuntimeOptions {
        exit_when_idle: args.once || command == Command::Templates,
    };

    info!(root = %root.display(), ?command, "starting");

    let core = CoreRuntime::new(scheduler, behaviour, queue_length, options);
    let session = Session::new(cfg, root, rt_tx);
    Runtime::new(core, rt_rx, executor, session).run(roots).await
}

/// Load the pipeline and work out the project root it is relative to.
///
/// - With `--config configs/site.toml` the root is `configs/`.
/// - With a bare file name, or no config at all, the root is the current
///   working directory.
pub fn load_config(path: Option<&Path>) -> Result<(ConfigFile, PathBuf)> {
    match path {
        Some(path) => {
            let cfg = load_and_validate(path)?;
            Ok((cfg, config_root_dir(path)?))
        }
        None => Ok((load_default()?, std::env::current_dir()?)),
    }
}

fn config_root_dir(config_path: &Path) -> Result<PathBuf> {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
        _ => Ok(std::env::current_dir()?),
    }
}

/// Units seeded into the first run for `command`.
pub fn initial_units(cfg: &ConfigFile, command: Command) -> Result<Vec<TaskName>> {
    match command {
        Command::Build => Ok(cfg.build_units()),
        Command::Templates => {
            let units = cfg.units_of_kind(UnitKind::Templates);
            if units.is_empty() {
                return Err(AssetdagError::UnitNotFound(
                    "no unit with kind = \"templates\" is configured".to_string(),
                ));
            }
            Ok(units)
        }
    }
}

/// Print the build graph and watch bindings without running anything.
fn print_dry_run(cfg: &ConfigFile, root: &Path, command: Command) {
    println!("assetdag dry-run");
    println!("  root = {}", root.display());
    println!(
        "  config.triggered_while_running_behaviour = {:?}",
        cfg.config().triggered_while_running_behaviour
    );
    println!("  config.queue_length = {}", cfg.config().queue_length);

    let server = cfg.server();
    if server.enabled {
        println!(
            "  server = http://{}:{} serving {} (reload port {})",
            server.host,
            server.port,
            server.root.display(),
            server.reload_port
        );
    } else {
        println!("  server = disabled");
    }
    if !cfg.reload().watch.is_empty() {
        println!("  reload.watch = {:?}", cfg.reload().watch);
    }
    println!();

    println!("units ({}):", cfg.units().len());
    for (name, unit) in cfg.units() {
        println!("  - {name} ({})", unit.kind);
        if !unit.src.is_empty() {
            println!("      src: {:?}", unit.src);
        }
        println!("      dest: {}", unit.dest.display());
        if !unit.after.is_empty() {
            println!("      after: {:?}", unit.after);
        }
        if !unit.exclude.is_empty() {
            println!("      exclude: {:?}", unit.exclude);
        }
        if !unit.preserve.is_empty() {
            println!("      preserve: {:?}", unit.preserve);
        }
        if matches!(unit.kind, UnitKind::Styles | UnitKind::Scripts) {
            println!("      bundle: {}", unit.bundle_name());
        }
        if let Some(kind) = unit.effective_notify() {
            println!("      notify: {kind:?}");
        }
        println!("      build: {}, watch: {}", unit.build, unit.effective_watch());
    }

    match initial_units(cfg, command) {
        Ok(units) => println!("\n{command:?} would run: {units:?}"),
        Err(err) => println!("\n{command:?}: {err}"),
    }

    debug!("dry-run complete (no execution)");
}
