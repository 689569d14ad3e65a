//! Loading pixel buffers from files of either kind the tool deals with.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::image_pipeline::common::config::PipelineConfig;
use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::raw::{PixelBuffer, PixelReader, RawLoaderReader};
use crate::image_pipeline::tiff::TiffPixelReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Intermediate TIFF, read with the `tiff` crate
    Tiff,
    /// Camera raw or DNG, read with rawloader
    Raw,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff") => {
                SourceKind::Tiff
            }
            _ => SourceKind::Raw,
        }
    }
}

/// Reads pixel buffers from disk, dispatching on the file extension.
pub struct PixelSource<R: PixelReader = RawLoaderReader> {
    raw_reader: R,
    tiff_reader: TiffPixelReader,
}

impl PixelSource<RawLoaderReader> {
    pub fn new() -> Self {
        Self::with_raw_reader(RawLoaderReader)
    }
}

impl Default for PixelSource<RawLoaderReader> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: PixelReader> PixelSource<R> {
    pub fn with_raw_reader(raw_reader: R) -> Self {
        Self {
            raw_reader,
            tiff_reader: TiffPixelReader,
        }
    }

    /// Decodes bytes that came from `path`.
    pub fn decode(&self, path: &Path, data: &[u8]) -> Result<PixelBuffer> {
        match SourceKind::from_path(path) {
            SourceKind::Tiff => self.tiff_reader.read_pixels(data),
            SourceKind::Raw => self.raw_reader.read_pixels(data),
        }
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(&self, path: &Path) -> Result<PixelBuffer> {
        let data = std::fs::read(path).map_err(|e| {
            ConversionError::InputReadError(format!("{}: {}", path.display(), e))
        })?;
        let pixels = self.decode(path, &data)?;
        debug!("Loaded {} ({} bit)", pixels.shape(), pixels.bits_per_sample());
        Ok(pixels)
    }
}

/// Files directly inside `dir` whose extension is a configured raw extension, sorted.
pub fn discover_raw_files(dir: &Path, config: &PipelineConfig) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        ConversionError::InputReadError(format!("{}: {}", dir.display(), e))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| config.is_raw_extension(ext));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
