use std::io::Cursor;

use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::raw::PixelReader;
use crate::image_pipeline::raw::types::PixelBuffer;

/// Reads the first image of an 8- or 16-bit grayscale or RGB TIFF.
///
/// The bit depth of the resulting buffer is the container's bit depth,
/// so a 14-bit sensor buffer written as Gray16 reads back as 16-bit.
pub struct TiffPixelReader;

impl PixelReader for TiffPixelReader {
    fn read_pixels(&self, data: &[u8]) -> Result<PixelBuffer> {
        let mut decoder = Decoder::new(Cursor::new(data))
            .map_err(|e| ConversionError::DecodeError(e.to_string()))?;

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| ConversionError::DecodeError(e.to_string()))?;
        let color_type = decoder
            .colortype()
            .map_err(|e| ConversionError::DecodeError(e.to_string()))?;

        let (samples_per_pixel, bits_per_sample) = match color_type {
            ColorType::Gray(bits @ (8 | 16)) => (1, bits as u32),
            ColorType::RGB(bits @ (8 | 16)) => (3, bits as u32),
            other => {
                return Err(ConversionError::UnsupportedFormat(format!(
                    "TIFF color type {:?}",
                    other
                )));
            }
        };

        debug!("Decoding TIFF image: {}x{} {:?}", width, height, color_type);

        let samples = match decoder
            .read_image()
            .map_err(|e| ConversionError::DecodeError(e.to_string()))?
        {
            DecodingResult::U16(values) => values,
            DecodingResult::U8(values) => values.into_iter().map(u16::from).collect(),
            _ => {
                return Err(ConversionError::UnsupportedFormat(
                    "TIFF sample format".to_string(),
                ));
            }
        };

        PixelBuffer::new(
            width as usize,
            height as usize,
            samples_per_pixel,
            bits_per_sample,
            samples,
        )
    }
}
