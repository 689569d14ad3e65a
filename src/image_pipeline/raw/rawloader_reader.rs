//! RAW image reader implementation using the rawloader library.
//!
//! Supports every format rawloader can decode (DNG, ARW, NEF, CR2, RAF, ...).
//! The full sensor area is returned; crops and black areas are left to
//! downstream consumers.

use std::io::Cursor;

use tracing::debug;
use rawloader::RawImageData as RawloaderImageData;
use crate::image_pipeline::common::error::{Result, ConversionError};
use crate::image_pipeline::raw::types::{PixelBuffer, MAX_BITS_PER_SAMPLE, significant_bits};
use crate::image_pipeline::raw::reader::PixelReader;

/// Pixel reader that uses the rawloader library for decoding.
pub struct RawLoaderReader;

impl PixelReader for RawLoaderReader {
    /// Decodes a RAW file and works out the sensor bit depth.
    ///
    /// Integer data is kept as-is. Float data (normalized 0.0-1.0) is scaled
    /// to the u16 range and reported as 16-bit.
    ///
    /// The bit depth is the number of bits needed for the largest white level
    /// (4095 -> 12, 16383 -> 14), raised when a decoded sample does not fit,
    /// so the result always satisfies the [`PixelBuffer`] range invariant.
    ///
    /// ```no_run
    /// use dng_decrement::image_pipeline::{PixelReader, RawLoaderReader};
    ///
    /// let raw_bytes = std::fs::read("image.dng").unwrap();
    /// let pixels = RawLoaderReader.read_pixels(&raw_bytes).unwrap();
    /// ```
    fn read_pixels(&self, data: &[u8]) -> Result<PixelBuffer> {
        debug!("Decoding RAW image, {} bytes", data.len());

        let decoded = rawloader::decode(&mut Cursor::new(data))
            .map_err(|e| ConversionError::DecodeError(e.to_string()))?;

        let width = decoded.width;
        let height = decoded.height;
        let samples_per_pixel = decoded.cpp;

        debug!("Decoded {} {}: {}x{}, {} sample(s) per pixel",
            decoded.clean_make, decoded.clean_model, width, height, samples_per_pixel);

        let (samples, white_level_bits) = match decoded.data {
            RawloaderImageData::Integer(values) => {
                let max_white_level = decoded.whitelevels.iter().max().copied().unwrap_or(u16::MAX);
                let bits = if max_white_level == 0 {
                    MAX_BITS_PER_SAMPLE
                } else {
                    significant_bits(max_white_level)
                };
                (values, bits)
            }
            RawloaderImageData::Float(values) => {
                let scaled = values
                    .iter()
                    .map(|&v| (v.clamp(0.0, 1.0) * u16::MAX as f32).round() as u16)
                    .collect();
                (scaled, MAX_BITS_PER_SAMPLE)
            }
        };

        let data_bits = significant_bits(samples.iter().copied().max().unwrap_or(0));
        let bits_per_sample = white_level_bits.max(data_bits).max(1);

        debug!("Calculated bits_per_sample: {} (white level bits: {}, data bits: {})",
            bits_per_sample, white_level_bits, data_bits);

        PixelBuffer::new(width, height, samples_per_pixel, bits_per_sample, samples)
    }
}
