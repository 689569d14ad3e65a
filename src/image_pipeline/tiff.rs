//! TIFF module
//!
//! Writing and reading of the uncompressed intermediate pixel file.

mod writer;
mod standard_tiff_writer;
mod tiff_reader;
pub mod types;

#[cfg(test)]
mod tests;

pub use writer::TiffWriter;
pub use standard_tiff_writer::StandardTiffWriter;
pub use tiff_reader::TiffPixelReader;
pub use types::TiffCompression;
