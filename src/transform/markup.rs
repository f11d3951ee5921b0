// src/transform/markup.rs

use anyhow::Result;
use regex::Regex;

use crate::errors::UnitError;
use crate::fs::FileSystem;
use crate::transform::{Outputs, PathSpec, TransformUnit, UnitReport};
use crate::types::UnitKind;

/// Elements whose surrounding whitespace never renders.
const BLOCK_TAGS: &str = "html|head|body|title|meta|link|base|div|p|ul|ol|li|dl|dt|dd|table|thead|tbody|tfoot|tr|th|td|caption|colgroup|col|section|article|aside|header|footer|nav|main|figure|figcaption|form|fieldset|legend|h[1-6]|hr|br|blockquote|address|details|summary|option|optgroup|select|iframe|video|audio|source|canvas|noscript|template";

/// Whitespace collapsing in the spirit of `collapseWhitespace`.
///
/// Content of `pre`, `textarea`, `script` and `style` is copied verbatim.
/// Elsewhere runs of whitespace become one space, and whitespace next to
/// block-level tags, the doctype, comments or a protected element is
/// dropped.
#[derive(Debug, Clone)]
pub struct HtmlMinifier {
    protected: Regex,
    whitespace: Regex,
    before_block: Regex,
    after_block: Regex,
}

impl HtmlMinifier {
    pub fn new() -> Result<Self> {
        Ok(Self {
            protected: Regex::new(
                r"(?is)<pre\b.*?</pre\s*>|<textarea\b.*?</textarea\s*>|<script\b.*?</script\s*>|<style\b.*?</style\s*>",
            )?,
            whitespace: Regex::new(r"\s+")?,
            before_block: Regex::new(&format!(r"(?i)\s+(</?(?:{BLOCK_TAGS})\b|<!)"))?,
            after_block: Regex::new(&format!(r"(?i)(</?(?:{BLOCK_TAGS})\b[^>]*>|<![^>]*>)\s+"))?,
        })
    }

    pub fn minify(&self, html: &str) -> String {
        let mut out = String::with_capacity(html.len());
        let mut last = 0;

        for m in self.protected.find_iter(html) {
            let text = self.collapse(&html[last..m.start()]);
            out.push_str(text.trim_end());
            out.push_str(m.as_str());
            last = m.end();
            // Whitespace right after a protected element is handled by the
            // next segment's trim_start below.
            if html[last..].starts_with(char::is_whitespace) {
                let rest = html[last..].trim_start();
                last = html.len() - rest.len();
            }
        }

        out.push_str(&self.collapse(&html[last..]));
        out.trim().to_string()
    }

    fn collapse(&self, text: &str) -> String {
        let text = self.whitespace.replace_all(text, " ");
        let text = self.before_block.replace_all(&text, "$1");
        self.after_block.replace_all(&text, "$1").into_owned()
    }
}

/// Whitespace-collapsed copies of the matched markup files.
#[derive(Debug, Clone)]
pub struct MarkupUnit {
    name: String,
    spec: PathSpec,
    minifier: HtmlMinifier,
}

impl MarkupUnit {
    pub fn new(name: impl Into<String>, spec: PathSpec) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            spec,
            minifier: HtmlMinifier::new()?,
        })
    }
}

impl TransformUnit for MarkupUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Markup
    }

    fn run(&self, fs: &dyn FileSystem) -> Result<UnitReport, UnitError> {
        let mut outputs = Outputs::new();

        for source in self.spec.sources(fs)? {
            let bytes = fs.read(&source.path)?;
            let html = String::from_utf8(bytes)
                .map_err(|e| UnitError::malformed(&source.path, format!("not valid UTF-8: {e}")))?;
            outputs.push(self.spec.output_path(&source.rel), self.minifier.minify(&html));
        }

        Ok(outputs.commit(fs)?)
    }
}
