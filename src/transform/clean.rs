// src/transform/clean.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::UnitError;
use crate::fs::FileSystem;
use crate::transform::{TransformUnit, UnitReport};
use crate::types::UnitKind;

/// Removes prior output under `dest`, keeping the `preserve` subpaths.
#[derive(Debug, Clone)]
pub struct CleanUnit {
    name: String,
    dest: PathBuf,
    /// Relative to `dest`.
    preserve: Vec<PathBuf>,
}

impl CleanUnit {
    pub fn new(name: impl Into<String>, dest: PathBuf, preserve: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dest,
            preserve,
        }
    }

    fn is_preserved(&self, rel: &Path) -> bool {
        self.preserve.iter().any(|keep| rel.starts_with(keep))
    }

    /// Whether `rel` is a directory holding a preserved path deeper down.
    fn contains_preserved(&self, rel: &Path) -> bool {
        self.preserve
            .iter()
            .any(|keep| keep.starts_with(rel) && keep != rel)
    }

    fn clean_dir(
        &self,
        fs: &dyn FileSystem,
        dir: &Path,
        report: &mut UnitReport,
    ) -> anyhow::Result<()> {
        for path in fs.read_dir(dir)? {
            let Ok(rel) = path.strip_prefix(&self.dest) else {
                continue;
            };

            if self.is_preserved(rel) {
                debug!(unit = %self.name, path = %path.display(), "preserved");
                continue;
            }

            if fs.is_dir(&path) {
                if self.contains_preserved(rel) {
                    self.clean_dir(fs, &path, report)?;
                } else {
                    fs.remove_dir_all(&path)?;
                    report.files += 1;
                }
            } else {
                fs.remove_file(&path)?;
                report.files += 1;
            }
        }
        Ok(())
    }
}

impl TransformUnit for CleanUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Clean
    }

    fn run(&self, fs: &dyn FileSystem) -> Result<UnitReport, UnitError> {
        let mut report = UnitReport::default();
        if !fs.is_dir(&self.dest) {
            debug!(unit = %self.name, dest = %self.dest.display(), "nothing to clean");
            return Ok(report);
        }
        self.clean_dir(fs, &self.dest, &mut report)?;
        Ok(report)
    }
}
