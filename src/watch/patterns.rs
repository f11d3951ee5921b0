// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::ConfigFile;
use crate::engine::TaskName;
use crate::fs::FileSystem;

/// Compiled source/exclude globs for one watched unit.
///
/// Patterns are relative to the project root; the watcher passes
/// root-relative paths with forward slashes (e.g. `"src/styles/a.scss"`).
#[derive(Clone)]
pub struct UnitWatchProfile {
    name: TaskName,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for UnitWatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitWatchProfile")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl UnitWatchProfile {
    pub fn new(name: impl Into<TaskName>, watch: &[String], exclude: &[String]) -> Result<Self> {
        let name = name.into();
        let watch_set = build_globset(watch)
            .with_context(|| format!("building watch globset for unit {name}"))?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(exclude)
                    .with_context(|| format!("building exclude globset for unit {name}"))?,
            )
        };

        Ok(Self {
            name,
            watch_set,
            exclude_set,
        })
    }

    /// Name of the unit this profile belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a change to `rel_path` should re-run this unit.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Generated files whose change only reloads connected clients.
#[derive(Clone)]
pub struct OutputProfile {
    set: GlobSet,
}

impl fmt::Debug for OutputProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputProfile").finish_non_exhaustive()
    }
}

impl OutputProfile {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let set = build_globset(patterns).context("building [reload] watch globset")?;
        Ok(Self { set })
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }
}

/// Everything the watcher needs to map a changed path to events.
#[derive(Debug, Clone)]
pub struct WatchBindings {
    pub units: Vec<UnitWatchProfile>,
    pub output: Option<OutputProfile>,
}

impl WatchBindings {
    /// Units bound to `rel_path`, in name order.
    pub fn units_for(&self, rel_path: &str) -> Vec<&str> {
        self.units
            .iter()
            .filter(|p| p.matches(rel_path))
            .map(|p| p.name())
            .collect()
    }

    pub fn is_output(&self, rel_path: &str) -> bool {
        self.output.as_ref().is_some_and(|o| o.matches(rel_path))
    }
}

/// Build a `GlobSet` where `*` does not cross `/`.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Compile the watch bindings of every unit with `watch = true`, plus the
/// `[reload] watch` output patterns.
pub fn build_profiles_from_config(cfg: &ConfigFile) -> Result<WatchBindings> {
    let units = cfg
        .units()
        .iter()
        .filter(|(_, unit)| unit.effective_watch() && !unit.src.is_empty())
        .map(|(name, unit)| UnitWatchProfile::new(name.clone(), &unit.src, &unit.exclude))
        .collect::<Result<Vec<_>>>()?;

    let output = if cfg.reload().watch.is_empty() {
        None
    } else {
        Some(OutputProfile::new(&cfg.reload().watch)?)
    };

    Ok(WatchBindings { units, output })
}

/// Collect all files under `root` that match `profile`.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    profile: &UnitWatchProfile,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if profile.matches(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}
