//! Pixel buffer types

use std::fmt;

use crate::image_pipeline::common::error::{ConversionError, Result};

/// Largest bit depth a [`PixelBuffer`] can hold.
pub const MAX_BITS_PER_SAMPLE: u32 = 16;

/// Geometry of a pixel buffer. Bit depth is not part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    pub width: usize,
    pub height: usize,
    pub samples_per_pixel: usize,
}

impl Shape {
    pub fn new(width: usize, height: usize, samples_per_pixel: usize) -> Self {
        Self {
            width,
            height,
            samples_per_pixel,
        }
    }

    /// Total number of samples, `width * height * samples_per_pixel`.
    pub fn sample_count(&self) -> usize {
        self.width * self.height * self.samples_per_pixel
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.samples_per_pixel)
    }
}

/// Decoded sensor samples, row-major with interleaved samples per pixel.
///
/// Every sample is guaranteed to be below `2^bits_per_sample`, and
/// `data.len()` always equals `shape().sample_count()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    samples_per_pixel: usize,
    bits_per_sample: u32,
    data: Vec<u16>,
}

impl PixelBuffer {
    pub fn new(
        width: usize,
        height: usize,
        samples_per_pixel: usize,
        bits_per_sample: u32,
        data: Vec<u16>,
    ) -> Result<Self> {
        if samples_per_pixel == 0 {
            return Err(ConversionError::UnsupportedFormat(
                "zero samples per pixel".to_string(),
            ));
        }
        if bits_per_sample == 0 || bits_per_sample > MAX_BITS_PER_SAMPLE {
            return Err(ConversionError::UnsupportedFormat(format!(
                "{} bits per sample",
                bits_per_sample
            )));
        }

        let shape = Shape::new(width, height, samples_per_pixel);
        if data.len() != shape.sample_count() {
            return Err(ConversionError::DecodeError(format!(
                "{} samples do not fill a {} buffer",
                data.len(),
                shape
            )));
        }

        let max_value = max_sample_value(bits_per_sample);
        if let Some(&sample) = data.iter().find(|&&v| v > max_value) {
            return Err(ConversionError::UnsupportedFormat(format!(
                "sample {} exceeds {}-bit range",
                sample, bits_per_sample
            )));
        }

        Ok(Self {
            width,
            height,
            samples_per_pixel,
            bits_per_sample,
            data,
        })
    }

    /// Single channel buffer whose bit depth is the smallest that holds every sample.
    pub fn from_samples(width: usize, height: usize, data: Vec<u16>) -> Result<Self> {
        let bits = significant_bits(data.iter().copied().max().unwrap_or(0)).max(1);
        Self::new(width, height, 1, bits, data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn samples_per_pixel(&self) -> usize {
        self.samples_per_pixel
    }

    pub fn bits_per_sample(&self) -> u32 {
        self.bits_per_sample
    }

    pub fn shape(&self) -> Shape {
        Shape::new(self.width, self.height, self.samples_per_pixel)
    }

    pub fn data(&self) -> &[u16] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u16> {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Smallest and largest sample, `None` for an empty buffer.
    pub fn value_range(&self) -> Option<(u16, u16)> {
        let min = self.data.iter().copied().min()?;
        let max = self.data.iter().copied().max()?;
        Some((min, max))
    }

    /// Copy of the buffer with `f` applied to every sample. Shape and bit depth are kept.
    pub fn map_samples(&self, f: impl Fn(u16) -> u16) -> Self {
        let max_value = max_sample_value(self.bits_per_sample);
        Self {
            data: self.data.iter().map(|&v| f(v).min(max_value)).collect(),
            ..self.clone()
        }
    }

    /// Rows of the first channel, `rows` x `cols` from the top-left corner.
    pub fn corner(&self, rows: usize, cols: usize) -> Vec<Vec<u16>> {
        let rows = rows.min(self.height);
        let cols = cols.min(self.width);
        (0..rows)
            .map(|y| {
                (0..cols)
                    .map(|x| self.data[(y * self.width + x) * self.samples_per_pixel])
                    .collect()
            })
            .collect()
    }
}

/// Largest value representable in `bits` bits (`bits` in 1..=16).
pub fn max_sample_value(bits: u32) -> u16 {
    if bits >= MAX_BITS_PER_SAMPLE {
        u16::MAX
    } else {
        (1u16 << bits) - 1
    }
}

/// Number of bits needed to represent `value`, 0 for 0.
pub fn significant_bits(value: u16) -> u32 {
    MAX_BITS_PER_SAMPLE - value.leading_zeros()
}
