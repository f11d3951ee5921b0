// src/transform/template.rs

use crate::errors::UnitError;
use crate::fs::FileSystem;
use crate::transform::command::run_filter;
use crate::transform::{Outputs, PathSpec, TransformUnit, UnitReport};
use crate::types::UnitKind;

/// Renders template sources to `.html` with an external renderer.
#[derive(Debug, Clone)]
pub struct TemplateUnit {
    name: String,
    spec: PathSpec,
    renderer: String,
}

impl TemplateUnit {
    pub fn new(name: impl Into<String>, spec: PathSpec, renderer: String) -> Self {
        Self {
            name: name.into(),
            spec,
            renderer,
        }
    }
}

impl TransformUnit for TemplateUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Templates
    }

    fn run(&self, fs: &dyn FileSystem) -> Result<UnitReport, UnitError> {
        let mut outputs = Outputs::new();

        for source in self.spec.sources(fs)? {
            let input = fs.read(&source.path)?;
            let rendered = run_filter(&self.renderer, &input, self.spec.root())?;
            if !rendered.success {
                return Err(UnitError::malformed(&source.path, rendered.stderr));
            }
            let out = self.spec.output_path(&source.rel.with_extension("html"));
            outputs.push(out, rendered.stdout);
        }

        Ok(outputs.commit(fs)?)
    }
}
