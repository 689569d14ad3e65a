//! Pipeline configuration

use crate::image_pipeline::tiff::types::TiffCompression;

/// Suffix appended to a source file name to form its backup path.
pub const DEFAULT_BACKUP_SUFFIX: &str = "backup";

/// Extension of the intermediate pixel file written next to each source.
pub const DEFAULT_OUTPUT_EXTENSION: &str = "tiff";

/// Configuration shared by the decrement, repack and verify pipelines
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Compression of the intermediate TIFF
    pub compression: TiffCompression,
    /// Predictor value for compression (2 for horizontal differencing)
    pub predictor: Option<u16>,
    /// Copy each source to `<name>.<ext>.<backup_suffix>` before writing anything
    pub create_backup: bool,
    pub backup_suffix: String,
    /// Extensions (without the dot, matched case-insensitively) picked up by directory scans
    pub raw_extensions: Vec<String>,
    pub output_extension: String,
    /// Reject zero-sized images before encoding
    pub validate_dimensions: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            compression: TiffCompression::None,
            predictor: None,
            create_backup: true,
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            raw_extensions: vec!["dng".to_string()],
            output_extension: DEFAULT_OUTPUT_EXTENSION.to_string(),
            validate_dimensions: true,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Whether `extension` is one of the configured raw extensions.
    pub fn is_raw_extension(&self, extension: &str) -> bool {
        self.raw_extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

/// Builder for PipelineConfig
#[derive(Default)]
pub struct PipelineConfigBuilder {
    compression: Option<TiffCompression>,
    predictor: Option<Option<u16>>,
    create_backup: Option<bool>,
    backup_suffix: Option<String>,
    raw_extensions: Option<Vec<String>>,
    output_extension: Option<String>,
    validate_dimensions: Option<bool>,
}

impl PipelineConfigBuilder {
    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn create_backup(mut self, enable: bool) -> Self {
        self.create_backup = Some(enable);
        self
    }

    pub fn backup_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.backup_suffix = Some(suffix.into());
        self
    }

    /// Replaces the extension list. Leading dots are stripped.
    pub fn raw_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.raw_extensions = Some(
            extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_string())
                .collect(),
        );
        self
    }

    pub fn output_extension(mut self, extension: impl Into<String>) -> Self {
        self.output_extension = Some(extension.into());
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn build(self) -> PipelineConfig {
        let default = PipelineConfig::default();
        PipelineConfig {
            compression: self.compression.unwrap_or(default.compression),
            predictor: self.predictor.unwrap_or(default.predictor),
            create_backup: self.create_backup.unwrap_or(default.create_backup),
            backup_suffix: self.backup_suffix.unwrap_or(default.backup_suffix),
            raw_extensions: self
                .raw_extensions
                .filter(|exts| !exts.is_empty())
                .unwrap_or(default.raw_extensions),
            output_extension: self.output_extension.unwrap_or(default.output_extension),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
        }
    }
}
