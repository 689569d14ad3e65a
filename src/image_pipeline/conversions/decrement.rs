use tracing::{debug, error, info, instrument, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::image_pipeline::{
    common::config::PipelineConfig,
    common::error::{ConversionError, Result},
    common::timing::PipelineTimings,
    raw::{PixelBuffer, PixelReader, RawLoaderReader, Shape},
    source::discover_raw_files,
    tiff::{StandardTiffWriter, TiffWriter},
};

/// `max(v - 1, 0)`. Never wraps.
pub fn decrement_sample(value: u16) -> u16 {
    value.saturating_sub(1)
}

/// Copy of `buffer` with every sample decremented; shape and bit depth unchanged.
pub fn decrement(buffer: &PixelBuffer) -> PixelBuffer {
    buffer.map_samples(decrement_sample)
}

/// One source file that went through the pipeline.
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Backup created by this run; `None` when disabled or already present
    pub backup: Option<PathBuf>,
    pub shape: Shape,
    pub bits_per_sample: u32,
    pub timings: PipelineTimings,
}

/// Outcome of a batch: every file either processed or failed, never skipped.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<ProcessedFile>,
    pub failed: Vec<(PathBuf, ConversionError)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.processed.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Reads a RAW file, decrements every sample and stores the result as a TIFF.
pub struct DecrementPipeline<R: PixelReader, W: TiffWriter> {
    reader: R,
    writer: W,
    config: PipelineConfig,
}

impl DecrementPipeline<RawLoaderReader, StandardTiffWriter> {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            reader: RawLoaderReader,
            writer: StandardTiffWriter,
            config,
        }
    }
}

impl<R: PixelReader, W: TiffWriter> DecrementPipeline<R, W> {
    pub fn with_custom(reader: R, writer: W, config: PipelineConfig) -> Self {
        Self {
            reader,
            writer,
            config,
        }
    }

    fn validate_dimensions(&self, width: usize, height: usize) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        if width == 0 || height == 0 {
            return Err(ConversionError::InvalidDimensions(width, height));
        }

        Ok(())
    }

    /// Decodes `input_data`, decrements it and encodes the result into `output`.
    /// Returns the decremented buffer.
    #[instrument(skip(self, input_data, output), fields(input_size = input_data.len()))]
    pub fn convert(&self, input_data: &[u8], output: &mut dyn Write) -> Result<PixelBuffer> {
        self.convert_timed(input_data, output, &mut PipelineTimings::new())
    }

    fn convert_timed(
        &self,
        input_data: &[u8],
        output: &mut dyn Write,
        timings: &mut PipelineTimings,
    ) -> Result<PixelBuffer> {
        let raw_image = timings.time("decode_raw", || {
            let _span = tracing::info_span!("decode_raw").entered();
            self.reader.read_pixels(input_data)
        })?;

        {
            let _span = tracing::info_span!("validate_dimensions",
                width = raw_image.width(),
                height = raw_image.height()
            ).entered();
            self.validate_dimensions(raw_image.width(), raw_image.height())?;
        }

        let decremented = timings.time("decrement", || {
            let _span = tracing::info_span!("decrement").entered();
            decrement(&raw_image)
        });

        if let (Some(before), Some(after)) = (raw_image.value_range(), decremented.value_range()) {
            info!(
                "Pixel range {}-{} -> {}-{} ({}, {} bit)",
                before.0,
                before.1,
                after.0,
                after.1,
                raw_image.shape(),
                raw_image.bits_per_sample()
            );
        }

        timings.time("encode_tiff", || {
            let _span = tracing::info_span!("encode_tiff").entered();
            self.writer.write_tiff(&decremented, output, &self.config)
        })?;

        Ok(decremented)
    }

    /// `<name>.<ext>.<backup_suffix>` next to the source.
    pub fn backup_path(&self, input_path: &Path) -> PathBuf {
        match input_path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => input_path.with_extension(format!("{}.{}", ext, self.config.backup_suffix)),
            None => input_path.with_extension(&self.config.backup_suffix),
        }
    }

    /// `<name>.<output_extension>` next to the source.
    pub fn output_path(&self, input_path: &Path) -> PathBuf {
        input_path.with_extension(&self.config.output_extension)
    }

    /// Copies the source aside unless a backup already exists.
    fn ensure_backup(&self, input_path: &Path) -> Result<Option<PathBuf>> {
        if !self.config.create_backup {
            return Ok(None);
        }

        let backup_path = self.backup_path(input_path);
        if backup_path.exists() {
            debug!("Keeping existing backup {}", backup_path.display());
            return Ok(None);
        }

        std::fs::copy(input_path, &backup_path).map_err(|e| {
            ConversionError::OutputWriteError(format!("{}: {}", backup_path.display(), e))
        })?;
        info!("Created backup {}", backup_path.display());
        Ok(Some(backup_path))
    }

    /// Backs up, decrements and writes one file. The TIFF is encoded in memory
    /// and written with a single call once encoding succeeded.
    #[instrument(skip(self, input_path), fields(input = %input_path.as_ref().display()))]
    pub fn process_file<P: AsRef<Path>>(&self, input_path: P) -> Result<ProcessedFile> {
        let input_path = input_path.as_ref();
        let output_path = self.output_path(input_path);
        let mut timings = PipelineTimings::new();

        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            "Processing file"
        );

        if !input_path.is_file() {
            return Err(ConversionError::InputReadError(format!(
                "{}: not a readable file",
                input_path.display()
            )));
        }

        let backup = timings.time("backup", || self.ensure_backup(input_path))?;

        let input_data = timings.time("read_input_file", || {
            std::fs::read(input_path).map_err(|e| {
                ConversionError::InputReadError(format!("{}: {}", input_path.display(), e))
            })
        })?;

        let mut encoded = Vec::new();
        let decremented = self.convert_timed(&input_data, &mut encoded, &mut timings)?;

        timings.time("write_output_file", || {
            std::fs::write(&output_path, &encoded).map_err(|e| {
                ConversionError::OutputWriteError(format!("{}: {}", output_path.display(), e))
            })
        })?;

        info!("Saved decremented pixels to {}", output_path.display());
        Ok(ProcessedFile {
            input: input_path.to_path_buf(),
            output: output_path,
            backup,
            shape: decremented.shape(),
            bits_per_sample: decremented.bits_per_sample(),
            timings,
        })
    }

    /// Processes every path in order. A failing file is logged and recorded;
    /// the remaining files are still processed.
    pub fn process_files(&self, paths: &[PathBuf]) -> BatchReport {
        let mut report = BatchReport::default();

        for path in paths {
            match self.process_file(path) {
                Ok(processed) => report.processed.push(processed),
                Err(e) => {
                    error!("Failed to process {}: {}", path.display(), e);
                    report.failed.push((path.clone(), e));
                }
            }
        }

        info!(
            "Processed {} of {} file(s), {} failed",
            report.processed.len(),
            report.total(),
            report.failed.len()
        );
        report
    }

    /// Processes every raw file directly inside `dir`.
    pub fn process_directory<P: AsRef<Path>>(&self, dir: P) -> Result<BatchReport> {
        let dir = dir.as_ref();
        let files = discover_raw_files(dir, &self.config)?;

        if files.is_empty() {
            warn!(
                "No files with extension(s) {:?} found in {}",
                self.config.raw_extensions,
                dir.display()
            );
        } else {
            info!("Found {} file(s) in {}", files.len(), dir.display());
        }

        Ok(self.process_files(&files))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}
