// src/transform/mod.rs

//! Transform units.
//!
//! Every unit turns the files matched by its [`PathSpec`] into files under
//! the path spec's destination directory. Units are stateless between runs and
//! only touch the disk through [`FileSystem`].
//!
//! - [`clean`] removes prior output.
//! - [`markup`] collapses whitespace in HTML.
//! - [`template`] renders template sources with an external renderer.
//! - [`images`] re-encodes images, skipping up-to-date outputs.
//! - [`styles`] compiles, prefixes and minifies stylesheets into one bundle.
//! - [`scripts`] transpiles and minifies scripts into one bundle.
//! - [`bundle`] joins per-file output and source maps.
//! - [`command`] runs external filter commands.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::config::{ConfigFile, UnitConfig};
use crate::engine::TaskName;
use crate::errors::UnitError;
use crate::fs::FileSystem;
use crate::types::UnitKind;

pub mod bundle;
pub mod clean;
pub mod command;
pub mod images;
pub mod markup;
pub mod pathspec;
pub mod scripts;
pub mod styles;
pub mod template;

pub use pathspec::{PathSpec, SourceFile};

/// One named transformation step.
pub trait TransformUnit: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;
    fn kind(&self) -> UnitKind;

    /// Run once over the current source tree.
    ///
    /// Source errors leave the destination untouched.
    fn run(&self, fs: &dyn FileSystem) -> std::result::Result<UnitReport, UnitError>;
}

/// What a unit invocation produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitReport {
    /// Files written, or removed for `clean`.
    pub files: usize,
    /// Aggregate size of all outputs of this invocation.
    pub bytes: u64,
    /// Outputs left alone because they were already up to date.
    pub skipped: usize,
}

impl fmt::Display for UnitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} file(s), {}", self.files, human_size(self.bytes))?;
        if self.skipped > 0 {
            write!(f, ", {} up to date", self.skipped)?;
        }
        Ok(())
    }
}

/// Format a byte count the way build tools usually print it.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "kB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

/// Outputs of one invocation, written together at the end.
///
/// Collecting first means a source error halfway through leaves nothing
/// half-written.
#[derive(Debug, Default)]
pub struct Outputs {
    files: Vec<(PathBuf, Vec<u8>)>,
}

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: PathBuf, contents: impl Into<Vec<u8>>) {
        self.files.push((path, contents.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write every output whose bytes differ from what is on disk.
    pub fn commit(self, fs: &dyn FileSystem) -> Result<UnitReport> {
        let mut report = UnitReport::default();
        for (path, contents) in self.files {
            report.bytes += contents.len() as u64;
            if write_if_changed(fs, &path, &contents)? {
                report.files += 1;
            } else {
                report.skipped += 1;
            }
        }
        Ok(report)
    }
}

/// Write `contents` unless the file already holds exactly these bytes.
///
/// Returns whether a write happened.
pub fn write_if_changed(fs: &dyn FileSystem, path: &Path, contents: &[u8]) -> Result<bool> {
    if fs.is_file(path) {
        if let Ok(existing) = fs.read(path) {
            if existing == contents {
                debug!(path = %path.display(), "output unchanged; not rewriting");
                return Ok(false);
            }
        }
    }
    fs.write(path, contents)?;
    Ok(true)
}

/// Build the unit described by one `[unit.<name>]` section.
pub fn build_unit(name: &str, cfg: &UnitConfig, root: &Path) -> Result<Arc<dyn TransformUnit>> {
    let spec = || PathSpec::new(root, &cfg.src, &cfg.exclude, &cfg.dest);

    let unit: Arc<dyn TransformUnit> = match cfg.kind {
        UnitKind::Clean => Arc::new(clean::CleanUnit::new(
            name,
            root.join(&cfg.dest),
            cfg.preserve.iter().map(PathBuf::from).collect(),
        )),
        UnitKind::Markup => Arc::new(markup::MarkupUnit::new(name, spec()?)?),
        UnitKind::Templates => Arc::new(template::TemplateUnit::new(
            name,
            spec()?,
            cfg.renderer.clone().unwrap_or_else(|| "pug".to_string()),
        )),
        UnitKind::Images => Arc::new(images::ImageUnit::new(name, spec()?)),
        UnitKind::Styles => Arc::new(styles::StyleUnit::new(
            name,
            spec()?,
            cfg.style_languages(),
            cfg.compilers.clone(),
            cfg.bundle_name(),
        )),
        UnitKind::Scripts => Arc::new(scripts::ScriptUnit::new(
            name,
            spec()?,
            cfg.bundle_name(),
            cfg.script_target(),
        )),
    };

    Ok(unit)
}

/// All configured units by name.
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    units: BTreeMap<TaskName, Arc<dyn TransformUnit>>,
}

impl UnitRegistry {
    pub fn from_config(cfg: &ConfigFile, root: &Path) -> Result<Self> {
        let mut units = BTreeMap::new();
        for (name, unit_cfg) in cfg.units() {
            units.insert(name.clone(), build_unit(name, unit_cfg, root)?);
        }
        Ok(Self { units })
    }

    pub fn from_units(units: impl IntoIterator<Item = Arc<dyn TransformUnit>>) -> Self {
        Self {
            units: units
                .into_iter()
                .map(|u| (u.name().to_string(), u))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TransformUnit>> {
        self.units.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(|s| s.as_str())
    }
}
