// src/transform/pathspec.rs

//! Source patterns and destination of one unit.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use globset::{GlobMatcher, GlobSet};

use crate::fs::FileSystem;
use crate::watch::build_globset;

/// A matched source file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    /// Absolute path.
    pub path: PathBuf,
    /// Path relative to the literal base of the pattern that matched it,
    /// e.g. `about/index.html` for `src/**/*.html`.
    pub rel: PathBuf,
}

#[derive(Debug, Clone)]
struct SourcePattern {
    matcher: GlobMatcher,
    base: PathBuf,
}

/// Match patterns over the source tree plus the destination directory.
#[derive(Debug, Clone)]
pub struct PathSpec {
    root: PathBuf,
    patterns: Vec<SourcePattern>,
    exclude: Option<GlobSet>,
    dest: PathBuf,
}

impl PathSpec {
    /// `src`, `exclude` and `dest` are relative to `root`.
    pub fn new(root: &Path, src: &[String], exclude: &[String], dest: &Path) -> Result<Self> {
        let patterns = src
            .iter()
            .map(|pat| {
                let matcher = globset::GlobBuilder::new(pat)
                    .literal_separator(true)
                    .build()
                    .with_context(|| format!("invalid glob pattern: {pat}"))?
                    .compile_matcher();
                Ok(SourcePattern {
                    matcher,
                    base: glob_base(pat),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let exclude = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude)?)
        };

        Ok(Self {
            root: root.to_path_buf(),
            patterns,
            exclude,
            dest: root.join(dest),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute destination directory.
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Where the output for `rel` lands.
    pub fn output_path(&self, rel: &Path) -> PathBuf {
        self.dest.join(rel)
    }

    /// All files matched by the source patterns, sorted by path.
    ///
    /// A pattern whose base directory does not exist is a filesystem error.
    /// A file matched by several patterns is returned once, with the
    /// relative path of the first pattern.
    pub fn sources(&self, fs: &dyn FileSystem) -> Result<Vec<SourceFile>> {
        let mut found: Vec<SourceFile> = Vec::new();

        for pattern in &self.patterns {
            let base = self.root.join(&pattern.base);
            if !fs.is_dir(&base) {
                bail!("source directory {:?} does not exist", base);
            }

            let mut stack = vec![base.clone()];
            while let Some(dir) = stack.pop() {
                for path in fs.read_dir(&dir)? {
                    if fs.is_dir(&path) {
                        stack.push(path);
                        continue;
                    }
                    if !fs.is_file(&path) || found.iter().any(|f| f.path == path) {
                        continue;
                    }
                    let Ok(from_root) = path.strip_prefix(&self.root) else {
                        continue;
                    };
                    let rel_str = from_root.to_string_lossy().replace('\\', "/");
                    if !pattern.matcher.is_match(&rel_str) {
                        continue;
                    }
                    if self.exclude.as_ref().is_some_and(|ex| ex.is_match(&rel_str)) {
                        continue;
                    }
                    let rel = path.strip_prefix(&base).unwrap_or(from_root).to_path_buf();
                    found.push(SourceFile { path, rel });
                }
            }
        }

        found.sort();
        Ok(found)
    }
}

/// Literal directory prefix of a glob: every leading component without
/// glob metacharacters. A pattern without any metacharacter is a single
/// file, so its base is the parent directory.
pub fn glob_base(pattern: &str) -> PathBuf {
    let components: Vec<&str> = pattern.split('/').collect();
    let is_glob = |c: &str| c.contains(['*', '?', '[', '{']);

    match components.iter().position(|c| is_glob(c)) {
        Some(idx) => components[..idx].iter().collect(),
        None => components[..components.len().saturating_sub(1)].iter().collect(),
    }
}
