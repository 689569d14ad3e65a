//! Image processing pipeline module
//!
//! RAW reading, TIFF writing and reading, DNG container splicing, pixel
//! statistics, and the conversions that tie them together.

pub mod common;
pub mod container;
pub mod conversions;
pub mod raw;
pub mod source;
pub mod stats;
pub mod tiff;

pub use common::{
    ConversionError,
    PipelineConfig,
    PipelineConfigBuilder,
    PipelineTimings,
    Result,
};

pub use raw::{
    PixelBuffer,
    PixelReader,
    RawLoaderReader,
    Shape,
};

pub use tiff::{
    StandardTiffWriter,
    TiffCompression,
    TiffPixelReader,
    TiffWriter,
};

pub use source::{PixelSource, discover_raw_files};
pub use stats::{DifferenceReport, PixelSummary};

pub use conversions::{
    BatchReport,
    DecrementPipeline,
    ProcessedFile,
    RepackedFile,
    Repacker,
    Verifier,
};
