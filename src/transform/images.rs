// src/transform/images.rs

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::errors::UnitError;
use crate::fs::FileSystem;
use crate::transform::{Outputs, PathSpec, TransformUnit, UnitReport};
use crate::types::UnitKind;

const JPEG_QUALITY: u8 = 80;

/// Re-encoded copies of the matched images.
///
/// A source whose output is newer is not reprocessed. PNG and JPEG files are
/// re-encoded and whichever of original and re-encoded is smaller is kept;
/// any other file is copied as is.
#[derive(Debug, Clone)]
pub struct ImageUnit {
    name: String,
    spec: PathSpec,
}

impl ImageUnit {
    pub fn new(name: impl Into<String>, spec: PathSpec) -> Self {
        Self {
            name: name.into(),
            spec,
        }
    }
}

impl TransformUnit for ImageUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Images
    }

    fn run(&self, fs: &dyn FileSystem) -> Result<UnitReport, UnitError> {
        let mut outputs = Outputs::new();
        let mut up_to_date = 0;

        for source in self.spec.sources(fs)? {
            let out = self.spec.output_path(&source.rel);
            if is_newer_than(fs, &out, &source.path) {
                debug!(unit = %self.name, path = %out.display(), "output is newer; skipping");
                up_to_date += 1;
                continue;
            }

            let original = fs.read(&source.path)?;
            let optimized = optimize(&original, &source.path)?;
            outputs.push(out, optimized);
        }

        let mut report = outputs.commit(fs)?;
        report.skipped += up_to_date;
        Ok(report)
    }
}

/// Whether `output` exists and was modified strictly after `source`.
pub fn is_newer_than(fs: &dyn FileSystem, output: &Path, source: &Path) -> bool {
    match (fs.modified(output), fs.modified(source)) {
        (Some(out), Some(src)) => out > src,
        _ => false,
    }
}

/// Smallest encoding of `bytes` this unit knows how to produce.
pub fn optimize(bytes: &[u8], path: &Path) -> Result<Vec<u8>, UnitError> {
    let format = match ImageFormat::from_path(path) {
        Ok(f @ (ImageFormat::Png | ImageFormat::Jpeg)) => f,
        _ => return Ok(bytes.to_vec()),
    };

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| UnitError::malformed(path, e.to_string()))?;

    let encoded = encode(&img, format).map_err(|e| UnitError::malformed(path, e.to_string()))?;

    if encoded.len() < bytes.len() {
        Ok(encoded)
    } else {
        Ok(bytes.to_vec())
    }
}

fn encode(img: &DynamicImage, format: ImageFormat) -> image::ImageResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    match format {
        ImageFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive);
            img.write_with_encoder(encoder)?;
        }
        _ => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
            rgb.write_with_encoder(encoder)?;
        }
    }
    Ok(buf.into_inner())
}
