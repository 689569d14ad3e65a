use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::raw::types::PixelBuffer;

/// Decodes the bytes of an image file into its pixel buffer.
pub trait PixelReader {
    fn read_pixels(&self, data: &[u8]) -> Result<PixelBuffer>;
}
