use std::io::{Cursor, Write};
use tracing::debug;
use tiff::encoder::{TiffEncoder, colortype};
use crate::image_pipeline::common::config::PipelineConfig;
use crate::image_pipeline::common::error::{Result, ConversionError};
use crate::image_pipeline::raw::types::PixelBuffer;
use crate::image_pipeline::tiff::writer::TiffWriter;

/// Writes baseline TIFFs through the `tiff` crate.
///
/// Buffers of 8 bits or less are stored as 8-bit samples, everything else as
/// 16-bit. One sample per pixel becomes MinIsBlack grayscale, three become RGB.
pub struct StandardTiffWriter;

impl TiffWriter for StandardTiffWriter {
    fn write_tiff(&self, image: &PixelBuffer, output: &mut dyn Write, config: &PipelineConfig) -> Result<()> {
        debug!(
            "Encoding TIFF image: {}x{}, {} bit(s), {} sample(s) per pixel",
            image.width(),
            image.height(),
            image.bits_per_sample(),
            image.samples_per_pixel()
        );

        let mut buffer = Vec::new();

        let mut encoder = TiffEncoder::new(Cursor::new(&mut buffer))
            .map_err(|e| ConversionError::EncodeError(e.to_string()))?
            .with_compression(config.compression.to_encoder());

        if let Some(predictor_val) = config.predictor {
            let predictor = match predictor_val {
                2 => tiff::tags::Predictor::Horizontal,
                _ => tiff::tags::Predictor::None,
            };
            encoder = encoder.with_predictor(predictor);
        }

        let width = image.width() as u32;
        let height = image.height() as u32;
        let narrow = image.bits_per_sample() <= 8;

        let written = match (image.samples_per_pixel(), narrow) {
            (1, false) => encoder.write_image::<colortype::Gray16>(width, height, image.data()),
            (3, false) => encoder.write_image::<colortype::RGB16>(width, height, image.data()),
            (1, true) => encoder.write_image::<colortype::Gray8>(width, height, &to_bytes(image)),
            (3, true) => encoder.write_image::<colortype::RGB8>(width, height, &to_bytes(image)),
            (spp, _) => {
                return Err(ConversionError::UnsupportedFormat(format!(
                    "cannot store {} samples per pixel in a TIFF",
                    spp
                )));
            }
        };
        written.map_err(|e| ConversionError::EncodeError(e.to_string()))?;

        output.write_all(&buffer)?;

        debug!("TIFF encoding complete, {} bytes", buffer.len());
        Ok(())
    }
}

// Samples are already known to fit in 8 bits.
fn to_bytes(image: &PixelBuffer) -> Vec<u8> {
    image.data().iter().map(|&v| v as u8).collect()
}
