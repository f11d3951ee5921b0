// src/transform/styles.rs

use std::collections::BTreeMap;
use std::path::Path;

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use tracing::debug;

use crate::errors::UnitError;
use crate::fs::FileSystem;
use crate::transform::bundle::{concat, relative_path, BundlePart, MapComment};
use crate::transform::command::run_filter;
use crate::transform::{Outputs, PathSpec, TransformUnit, UnitReport};
use crate::types::UnitKind;

/// Browser baseline used for vendor prefixes and syntax lowering.
fn browser_targets() -> Targets {
    Targets::from(Browsers {
        chrome: Some(80 << 16),
        edge: Some(80 << 16),
        firefox: Some(78 << 16),
        safari: Some(12 << 16),
        ios_saf: Some(12 << 16),
        ..Browsers::default()
    })
}

/// Parse, prefix and minify one stylesheet.
pub fn minify_css(source: &str, filename: &str) -> Result<String, String> {
    let targets = browser_targets();

    let mut sheet = StyleSheet::parse(
        source,
        ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| e.to_string())?;

    sheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..MinifyOptions::default()
        })
        .map_err(|e| e.to_string())?;

    let out = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;

    Ok(out.code)
}

/// Style sources compiled into one minified bundle with a source map.
///
/// Only extensions in `languages` are picked up; partials (`_name.scss`)
/// are skipped. An extension with an entry in `compilers` is piped through
/// that command first, everything else is parsed as CSS directly.
#[derive(Debug, Clone)]
pub struct StyleUnit {
    name: String,
    spec: PathSpec,
    languages: Vec<String>,
    compilers: BTreeMap<String, String>,
    bundle: String,
}

impl StyleUnit {
    pub fn new(
        name: impl Into<String>,
        spec: PathSpec,
        languages: Vec<String>,
        compilers: BTreeMap<String, String>,
        bundle: String,
    ) -> Self {
        Self {
            name: name.into(),
            spec,
            languages,
            compilers,
            bundle,
        }
    }

    fn accepts(&self, path: &Path) -> bool {
        let is_partial = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('_'));
        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.languages.iter().any(|l| l.eq_ignore_ascii_case(ext)));
        ext_ok && !is_partial
    }

    fn compile(&self, fs: &dyn FileSystem, path: &Path) -> Result<(String, String), UnitError> {
        let text = fs.read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();

        let css = match self.compilers.get(ext) {
            Some(cmd) => {
                let cwd = path.parent().unwrap_or(self.spec.root());
                let out = run_filter(cmd, text.as_bytes(), cwd)?;
                if !out.success {
                    return Err(UnitError::malformed(path, out.stderr));
                }
                String::from_utf8(out.stdout).map_err(|e| {
                    UnitError::malformed(path, format!("compiler output is not UTF-8: {e}"))
                })?
            }
            None => text.clone(),
        };

        let filename = path.to_string_lossy();
        let minified = minify_css(&css, &filename).map_err(|msg| UnitError::malformed(path, msg))?;
        Ok((text, minified))
    }
}

impl TransformUnit for StyleUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Styles
    }

    fn run(&self, fs: &dyn FileSystem) -> Result<UnitReport, UnitError> {
        let mut parts = Vec::new();

        for source in self.spec.sources(fs)? {
            if !self.accepts(&source.path) {
                debug!(
                    unit = %self.name,
                    path = %source.path.display(),
                    "not a bundled style source"
                );
                continue;
            }
            let (source_text, code) = self.compile(fs, &source.path)?;
            parts.push(BundlePart {
                source_name: relative_path(self.spec.dest(), &source.path),
                source_text,
                code,
                map: None,
            });
        }

        if parts.is_empty() {
            debug!(unit = %self.name, "no style sources");
            return Ok(UnitReport::default());
        }

        let bundle = concat(&parts, &self.bundle, MapComment::Css);
        let mut outputs = Outputs::new();
        outputs.push(self.spec.dest().join(&self.bundle), bundle.code);
        outputs.push(
            self.spec.dest().join(format!("{}.map", self.bundle)),
            bundle.map_json,
        );
        Ok(outputs.commit(fs)?)
    }
}
