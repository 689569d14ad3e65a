use std::path::{Path, PathBuf};

use tracing::{error, info, instrument};

use crate::image_pipeline::{
    common::error::Result,
    raw::{PixelReader, RawLoaderReader},
    source::PixelSource,
    stats::{DifferenceReport, PixelSummary},
};

/// Read-only comparison and inspection of pixel files.
pub struct Verifier<R: PixelReader = RawLoaderReader> {
    source: PixelSource<R>,
}

impl Verifier<RawLoaderReader> {
    pub fn new() -> Self {
        Self {
            source: PixelSource::new(),
        }
    }
}

impl Default for Verifier<RawLoaderReader> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: PixelReader> Verifier<R> {
    pub fn with_source(source: PixelSource<R>) -> Self {
        Self { source }
    }

    /// Statistics of `second - first`.
    #[instrument(skip_all, fields(first = %first.display(), second = %second.display()))]
    pub fn compare_files(&self, first: &Path, second: &Path) -> Result<DifferenceReport> {
        let a = self.source.load(first)?;
        let b = self.source.load(second)?;
        let report = DifferenceReport::compute(&a, &b)?;
        info!(
            "{} of {} samples differ by -1",
            report.minus_one_count, report.total
        );
        Ok(report)
    }

    pub fn inspect_file(&self, path: &Path) -> Result<PixelSummary> {
        let pixels = self.source.load(path)?;
        PixelSummary::compute(&pixels)
    }

    /// Inspects every path; a file that fails is logged and the rest still run.
    pub fn inspect_files(&self, paths: &[PathBuf]) -> Vec<(PathBuf, Result<PixelSummary>)> {
        paths
            .iter()
            .map(|path| {
                let result = self.inspect_file(path);
                if let Err(e) = &result {
                    error!("Failed to inspect {}: {}", path.display(), e);
                }
                (path.clone(), result)
            })
            .collect()
    }
}
