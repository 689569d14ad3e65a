use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::image_pipeline::{
    common::error::{ConversionError, Result},
    container::{SpliceMode, SpliceOutcome, splice_pixels},
    raw::{PixelBuffer, PixelReader, RawLoaderReader, Shape},
    source::PixelSource,
};

/// Extension used for the repacked file when the original has none.
const FALLBACK_EXTENSION: &str = "dng";

#[derive(Debug, Clone)]
pub struct RepackedFile {
    pub output: PathBuf,
    pub mode: SpliceMode,
    pub shape: Shape,
}

/// `<modified stem>_modified.<original extension>` in the modified file's directory.
pub fn default_output_path(modified: &Path, original: &Path) -> PathBuf {
    let stem = modified
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = original
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

    modified.with_file_name(format!("{}_modified.{}", stem, extension))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Puts modified pixels back into the container they came from.
pub struct Repacker<R: PixelReader = RawLoaderReader> {
    source: PixelSource<R>,
}

impl Repacker<RawLoaderReader> {
    pub fn new() -> Self {
        Self {
            source: PixelSource::new(),
        }
    }
}

impl Default for Repacker<RawLoaderReader> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: PixelReader> Repacker<R> {
    pub fn with_source(source: PixelSource<R>) -> Self {
        Self { source }
    }

    pub fn repack(&self, pixels: &PixelBuffer, original: &[u8]) -> Result<SpliceOutcome> {
        let _span = tracing::info_span!("splice", shape = %pixels.shape()).entered();
        splice_pixels(original, pixels)
    }

    /// Reads `modified` and `original`, splices and writes the result.
    /// Nothing is written unless the splice succeeded.
    #[instrument(skip_all, fields(modified = %modified.display(), original = %original.display()))]
    pub fn convert_file(
        &self,
        modified: &Path,
        original: &Path,
        output: Option<&Path>,
    ) -> Result<RepackedFile> {
        let output_path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_path(modified, original));

        if same_file(&output_path, original) {
            return Err(ConversionError::OutputWriteError(format!(
                "{}: refusing to overwrite the original container",
                output_path.display()
            )));
        }

        let pixels = self.source.load(modified)?;
        let original_bytes = std::fs::read(original).map_err(|e| {
            ConversionError::InputReadError(format!("{}: {}", original.display(), e))
        })?;

        let outcome = self.repack(&pixels, &original_bytes)?;

        std::fs::write(&output_path, &outcome.bytes).map_err(|e| {
            ConversionError::OutputWriteError(format!("{}: {}", output_path.display(), e))
        })?;

        info!(
            "Wrote {} ({} bytes, {:?})",
            output_path.display(),
            outcome.bytes.len(),
            outcome.mode
        );
        Ok(RepackedFile {
            output: output_path,
            mode: outcome.mode,
            shape: pixels.shape(),
        })
    }
}
