// src/transform/scripts.rs

use std::path::{Path, PathBuf};

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc_sourcemap::SourceMap;
use oxc::span::SourceType;
use oxc::transformer::{TransformOptions, Transformer};

use crate::errors::UnitError;
use crate::fs::FileSystem;
use crate::transform::bundle::{concat, relative_path, BundlePart, MapComment};
use crate::transform::{Outputs, PathSpec, TransformUnit, UnitReport};
use crate::types::UnitKind;

/// Minified output of one script plus its map.
#[derive(Debug)]
pub struct CompiledScript {
    pub code: String,
    pub map: Option<SourceMap>,
}

fn join_errors<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parse, lower to `target`, minify and print one classic script.
///
/// `map_source` is the name recorded in the map's `sources`.
pub fn compile_script(
    source: &str,
    path: &Path,
    target: &str,
    map_source: &str,
) -> Result<CompiledScript, String> {
    let allocator = Allocator::default();
    let source_type = SourceType::cjs();

    let parsed = Parser::new(&allocator, source, source_type).parse();
    if !parsed.errors.is_empty() {
        return Err(join_errors(&parsed.errors));
    }
    let mut program = parsed.program;

    let semantic = SemanticBuilder::new().build(&program);
    if !semantic.errors.is_empty() {
        return Err(join_errors(&semantic.errors));
    }
    let scoping = semantic.semantic.into_scoping();

    let options = TransformOptions::from_target(target).map_err(|e| e.to_string())?;
    let transformed =
        Transformer::new(&allocator, path, &options).build_with_scoping(scoping, &mut program);
    if !transformed.errors.is_empty() {
        return Err(join_errors(&transformed.errors));
    }

    let minified = Minifier::new(MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    })
    .minify(&allocator, &mut program);

    let printed = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            source_map_path: Some(PathBuf::from(map_source)),
            ..CodegenOptions::default()
        })
        .with_scoping(minified.scoping)
        .build(&program);

    Ok(CompiledScript {
        code: printed.code,
        map: printed.map,
    })
}

/// Script sources transpiled, minified and concatenated into one bundle.
///
/// A syntax error in any file aborts the whole invocation; the previous
/// bundle stays in place.
#[derive(Debug, Clone)]
pub struct ScriptUnit {
    name: String,
    spec: PathSpec,
    bundle: String,
    target: String,
}

impl ScriptUnit {
    pub fn new(name: impl Into<String>, spec: PathSpec, bundle: String, target: String) -> Self {
        Self {
            name: name.into(),
            spec,
            bundle,
            target,
        }
    }
}

impl TransformUnit for ScriptUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Scripts
    }

    fn run(&self, fs: &dyn FileSystem) -> Result<UnitReport, UnitError> {
        let mut parts = Vec::new();

        for source in self.spec.sources(fs)? {
            let text = fs.read_to_string(&source.path)?;
            let source_name = relative_path(self.spec.dest(), &source.path);
            let compiled = compile_script(&text, &source.path, &self.target, &source_name)
                .map_err(|msg| UnitError::malformed(&source.path, msg))?;
            parts.push(BundlePart {
                source_name,
                source_text: text,
                code: compiled.code,
                map: compiled.map,
            });
        }

        if parts.is_empty() {
            return Ok(UnitReport::default());
        }

        let bundle = concat(&parts, &self.bundle, MapComment::Js);
        let mut outputs = Outputs::new();
        outputs.push(self.spec.dest().join(&self.bundle), bundle.code);
        outputs.push(
            self.spec.dest().join(format!("{}.map", self.bundle)),
            bundle.map_json,
        );
        Ok(outputs.commit(fs)?)
    }
}
