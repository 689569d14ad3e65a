//! Location and geometry of the raw image payload inside a TIFF/DNG.

use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::container::ifd::{Ifd, IfdEntry, TiffContainer, tags};
use crate::image_pipeline::raw::types::Shape;

pub const COMPRESSION_NONE: u32 = 1;
pub const PLANAR_CHUNKY: u32 = 1;
pub const PHOTOMETRIC_CFA: u32 = 32803;
pub const PHOTOMETRIC_LINEAR_RAW: u32 = 34892;
pub const SAMPLE_FORMAT_UINT: u32 = 1;
/// NewSubFileType of a full-resolution image.
const SUBFILE_FULL_RESOLUTION: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Strips { rows_per_strip: usize },
    Tiles { tile_width: usize, tile_length: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub offset: usize,
    pub byte_count: usize,
}

/// Pixel rectangle covered by one strip or tile.
///
/// `columns` x `rows` is the stored size, which for edge tiles extends past
/// the image. Those padding samples are written as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentGeometry {
    pub x: usize,
    pub y: usize,
    pub columns: usize,
    pub rows: usize,
}

impl SegmentGeometry {
    /// Bytes the segment occupies when stored uncompressed; `None` on overflow.
    pub fn stored_size(&self, samples_per_pixel: usize, sample_size: usize) -> Option<usize> {
        self.columns
            .checked_mul(self.rows)?
            .checked_mul(samples_per_pixel)?
            .checked_mul(sample_size)
    }
}

/// The raw image IFD and the entries that describe its payload.
#[derive(Debug, Clone)]
pub struct RawLayout {
    pub ifd_offset: usize,
    pub shape: Shape,
    pub bits_per_sample: u32,
    pub compression: u32,
    pub planar_configuration: u32,
    /// 1 unsigned integer, 2 signed, 3 floating point
    pub sample_format: u32,
    pub kind: SegmentKind,
    pub segments: Vec<Segment>,
    pub offsets_entry: IfdEntry,
    pub byte_counts_entry: IfdEntry,
    pub compression_entry: Option<IfdEntry>,
    pub bits_entry: Option<IfdEntry>,
    pub predictor_entry: Option<IfdEntry>,
    pub has_linearization_table: bool,
}

impl RawLayout {
    /// Finds the full-resolution raw image.
    ///
    /// Candidates are IFDs with NewSubFileType 0 that carry strip or tile
    /// offsets. CFA and LinearRaw images win over anything else (a DNG's IFD0
    /// is usually a preview); ties go to the larger image, then to the first.
    pub fn locate(container: &TiffContainer<'_>) -> Result<Self> {
        let mut best: Option<(bool, usize, &Ifd)> = None;

        for ifd in container.ifds() {
            let has_payload = ifd.find(tags::STRIP_OFFSETS).is_some()
                || ifd.find(tags::TILE_OFFSETS).is_some();
            if !has_payload
                || container.value_or(ifd, tags::NEW_SUBFILE_TYPE, SUBFILE_FULL_RESOLUTION)?
                    != SUBFILE_FULL_RESOLUTION
            {
                continue;
            }

            let photometric = container.value_or(ifd, tags::PHOTOMETRIC_INTERPRETATION, 0)?;
            let is_raw = matches!(photometric, PHOTOMETRIC_CFA | PHOTOMETRIC_LINEAR_RAW);
            let area = container.value_or(ifd, tags::IMAGE_WIDTH, 0)? as usize
                * container.value_or(ifd, tags::IMAGE_LENGTH, 0)? as usize;

            let better = match best {
                None => true,
                Some((best_raw, best_area, _)) => (is_raw, area) > (best_raw, best_area),
            };
            if better {
                best = Some((is_raw, area, ifd));
            }
        }

        let (_, _, ifd) = best.ok_or_else(|| {
            ConversionError::MalformedContainer("no full-resolution image found".to_string())
        })?;
        Self::from_ifd(container, ifd)
    }

    fn from_ifd(container: &TiffContainer<'_>, ifd: &Ifd) -> Result<Self> {
        let width = container.required(ifd, tags::IMAGE_WIDTH)? as usize;
        let height = container.required(ifd, tags::IMAGE_LENGTH)? as usize;
        if width == 0 || height == 0 {
            return Err(ConversionError::InvalidDimensions(width, height));
        }
        let samples_per_pixel = container.value_or(ifd, tags::SAMPLES_PER_PIXEL, 1)? as usize;
        let shape = Shape::new(width, height, samples_per_pixel);

        let bits_entry = ifd.find(tags::BITS_PER_SAMPLE).cloned();
        let bits_per_sample = match &bits_entry {
            Some(entry) => {
                let bits = container.values(entry)?;
                let first = bits.first().copied().unwrap_or(1);
                if bits.iter().any(|&b| b != first) {
                    return Err(ConversionError::UnsupportedFormat(format!(
                        "mixed bits per sample {:?}",
                        bits
                    )));
                }
                first
            }
            None => 1,
        };

        let compression_entry = ifd.find(tags::COMPRESSION).cloned();
        let compression = match &compression_entry {
            Some(entry) => container.values(entry)?.first().copied().unwrap_or(COMPRESSION_NONE),
            None => COMPRESSION_NONE,
        };

        let planar_configuration = container.value_or(ifd, tags::PLANAR_CONFIGURATION, PLANAR_CHUNKY)?;
        if planar_configuration != PLANAR_CHUNKY && samples_per_pixel > 1 {
            return Err(ConversionError::UnsupportedFormat(
                "planar sample layout".to_string(),
            ));
        }

        let sample_format = container.value_or(ifd, tags::SAMPLE_FORMAT, SAMPLE_FORMAT_UINT)?;

        let (kind, offsets_tag, counts_tag) = match ifd.find(tags::TILE_OFFSETS) {
            Some(_) => (
                SegmentKind::Tiles {
                    tile_width: container.required(ifd, tags::TILE_WIDTH)? as usize,
                    tile_length: container.required(ifd, tags::TILE_LENGTH)? as usize,
                },
                tags::TILE_OFFSETS,
                tags::TILE_BYTE_COUNTS,
            ),
            None => (
                SegmentKind::Strips {
                    rows_per_strip: (container.value_or(ifd, tags::ROWS_PER_STRIP, u32::MAX)? as usize)
                        .min(height),
                },
                tags::STRIP_OFFSETS,
                tags::STRIP_BYTE_COUNTS,
            ),
        };

        let missing = |tag: u16| {
            ConversionError::MalformedContainer(format!(
                "raw IFD at offset {} lacks tag {}",
                ifd.offset, tag
            ))
        };
        let offsets_entry = ifd.find(offsets_tag).cloned().ok_or_else(|| missing(offsets_tag))?;
        let byte_counts_entry = ifd.find(counts_tag).cloned().ok_or_else(|| missing(counts_tag))?;

        let offsets = container.values(&offsets_entry)?;
        let byte_counts = container.values(&byte_counts_entry)?;

        let layout = Self {
            ifd_offset: ifd.offset,
            shape,
            bits_per_sample,
            compression,
            planar_configuration,
            sample_format,
            kind,
            segments: offsets
                .iter()
                .zip(&byte_counts)
                .map(|(&offset, &byte_count)| Segment {
                    offset: offset as usize,
                    byte_count: byte_count as usize,
                })
                .collect(),
            offsets_entry,
            byte_counts_entry,
            compression_entry,
            bits_entry,
            predictor_entry: ifd.find(tags::PREDICTOR).cloned(),
            has_linearization_table: ifd.find(tags::LINEARIZATION_TABLE).is_some(),
        };

        let expected = layout.segment_count()?;
        if offsets.len() != expected || byte_counts.len() != expected {
            return Err(ConversionError::MalformedContainer(format!(
                "expected {} segments, found {} offsets and {} byte counts",
                expected,
                offsets.len(),
                byte_counts.len()
            )));
        }

        debug!(
            "Raw image at IFD offset {}: {}, {} bit(s), compression {}, {} segment(s)",
            layout.ifd_offset,
            layout.shape,
            layout.bits_per_sample,
            layout.compression,
            layout.segments.len()
        );
        Ok(layout)
    }

    /// Byte width of a stored sample when the payload can be overwritten as-is.
    pub fn in_place_sample_size(&self) -> Option<usize> {
        if self.compression != COMPRESSION_NONE {
            return None;
        }
        match self.bits_per_sample {
            8 => Some(1),
            16 => Some(2),
            _ => None,
        }
    }

    /// Number of strips or tiles the image needs, computed without building them.
    pub fn segment_count(&self) -> Result<usize> {
        let Shape { width, height, .. } = self.shape;
        match self.kind {
            SegmentKind::Strips { rows_per_strip } => {
                if rows_per_strip == 0 {
                    return Err(ConversionError::MalformedContainer(
                        "RowsPerStrip is zero".to_string(),
                    ));
                }
                Ok(height.div_ceil(rows_per_strip))
            }
            SegmentKind::Tiles { tile_width, tile_length } => {
                if tile_width == 0 || tile_length == 0 {
                    return Err(ConversionError::MalformedContainer(format!(
                        "tile size {}x{}",
                        tile_width, tile_length
                    )));
                }
                width
                    .div_ceil(tile_width)
                    .checked_mul(height.div_ceil(tile_length))
                    .ok_or_else(|| ConversionError::MalformedContainer("tile count overflows".to_string()))
            }
        }
    }

    /// Rectangles of every segment, in segment order.
    pub fn geometry(&self) -> Result<Vec<SegmentGeometry>> {
        let Shape { width, height, .. } = self.shape;
        let count = self.segment_count()?;
        let rects = match self.kind {
            SegmentKind::Strips { rows_per_strip } => (0..count)
                .map(|i| {
                    let y = i * rows_per_strip;
                    SegmentGeometry {
                        x: 0,
                        y,
                        columns: width,
                        rows: rows_per_strip.min(height - y),
                    }
                })
                .collect(),
            SegmentKind::Tiles { tile_width, tile_length } => {
                let across = width.div_ceil(tile_width);
                (0..count)
                    .map(|i| SegmentGeometry {
                        x: (i % across) * tile_width,
                        y: (i / across) * tile_length,
                        columns: tile_width,
                        rows: tile_length,
                    })
                    .collect()
            }
        };
        Ok(rects)
    }
}
