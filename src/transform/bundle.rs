// src/transform/bundle.rs

//! Concatenation of per-file output into one bundle plus its source map.

use std::path::{Component, Path};

use oxc_sourcemap::{ConcatSourceMapBuilder, SourceMap, SourceMapBuilder};

/// One compiled input of a bundle.
#[derive(Debug)]
pub struct BundlePart {
    /// Name recorded in the map's `sources`.
    pub source_name: String,
    pub source_text: String,
    pub code: String,
    /// Map of `code` back to `source_text`, when the compiler produced one.
    pub map: Option<SourceMap>,
}

/// Joined bundle text and its source map as JSON.
#[derive(Debug)]
pub struct Bundle {
    pub code: String,
    pub map_json: String,
}

/// How the bundle points at its map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapComment {
    /// `/*# sourceMappingURL=... */`
    Css,
    /// `//# sourceMappingURL=...`
    Js,
}

impl MapComment {
    fn render(self, map_name: &str) -> String {
        match self {
            MapComment::Css => format!("/*# sourceMappingURL={map_name} */"),
            MapComment::Js => format!("//# sourceMappingURL={map_name}"),
        }
    }
}

/// Join `parts` with newlines and build the combined source map.
///
/// Parts without their own map are mapped line by line to the start of
/// their source.
pub fn concat(parts: &[BundlePart], bundle_name: &str, comment: MapComment) -> Bundle {
    let mut code = String::new();
    let mut line_offsets = Vec::with_capacity(parts.len());
    let mut line: u32 = 0;

    for part in parts {
        let chunk = part.code.trim_end_matches('\n');
        line_offsets.push(line);
        code.push_str(chunk);
        code.push('\n');
        line += chunk.matches('\n').count() as u32 + 1;
    }

    let map_name = format!("{bundle_name}.map");
    code.push_str(&comment.render(&map_name));
    code.push('\n');

    let map = if parts.iter().all(|p| p.map.is_some()) {
        let pairs: Vec<(&SourceMap, u32)> = parts
            .iter()
            .zip(&line_offsets)
            .filter_map(|(p, offset)| p.map.as_ref().map(|m| (m, *offset)))
            .collect();
        ConcatSourceMapBuilder::from_sourcemaps(&pairs).into_sourcemap()
    } else {
        line_map(parts, &line_offsets)
    };

    Bundle {
        code,
        map_json: map.to_json_string(),
    }
}

fn line_map(parts: &[BundlePart], line_offsets: &[u32]) -> SourceMap {
    let mut builder = SourceMapBuilder::default();
    for (part, offset) in parts.iter().zip(line_offsets) {
        let id = builder.add_source_and_content(&part.source_name, &part.source_text);
        let lines = part.code.trim_end_matches('\n').matches('\n').count() as u32 + 1;
        for dst_line in *offset..*offset + lines {
            builder.add_token(dst_line, 0, 0, 0, Some(id), None);
        }
    }
    builder.into_sourcemap()
}

/// `to` relative to the directory `from_dir`, with forward slashes.
///
/// Used for `sources` entries so the map resolves from the bundle's folder.
pub fn relative_path(from_dir: &Path, to: &Path) -> String {
    let from: Vec<Component> = from_dir.components().collect();
    let to_parts: Vec<Component> = to.components().collect();

    let common = from
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    for _ in common..from.len() {
        segments.push("..".to_string());
    }
    for part in &to_parts[common..] {
        segments.push(part.as_os_str().to_string_lossy().into_owned());
    }
    segments.join("/")
}
