use thiserror::Error;

use crate::image_pipeline::raw::types::Shape;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Failed to encode TIFF image: {0}")]
    EncodeError(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: Shape, found: Shape },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed TIFF container: {0}")]
    MalformedContainer(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConversionError>;
