//! Replacement of the raw pixel payload of a TIFF/DNG.

use tracing::{debug, warn};

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::container::ifd::{ByteOrder, ENTRY_SIZE, IfdEntry, TiffContainer, field_types, slice_at};
use crate::image_pipeline::container::layout::{
    COMPRESSION_NONE, RawLayout, SAMPLE_FORMAT_UINT, SegmentGeometry,
};
use crate::image_pipeline::raw::types::PixelBuffer;

/// Bit depth of payloads written by the rewrite path.
const REWRITE_BITS_PER_SAMPLE: u16 = 16;
/// Predictor value meaning "no prediction".
const PREDICTOR_NONE: u32 = 1;

/// How the payload was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpliceMode {
    /// Uncompressed samples overwritten where they were; file size unchanged
    InPlace,
    /// Uncompressed 16-bit segments appended and the layout entries repointed
    Rewritten,
}

#[derive(Debug, Clone)]
pub struct SpliceOutcome {
    pub bytes: Vec<u8>,
    pub mode: SpliceMode,
}

/// Returns a copy of `container_bytes` whose raw image payload holds `pixels`.
///
/// Everything outside the payload is carried over byte for byte. When the
/// payload is not plain 8- or 16-bit samples, the original segments are left
/// untouched and only the raw IFD's offset, byte count, Compression,
/// BitsPerSample and Predictor entries change.
pub fn splice_pixels(container_bytes: &[u8], pixels: &PixelBuffer) -> Result<SpliceOutcome> {
    let container = TiffContainer::parse(container_bytes)?;
    let layout = RawLayout::locate(&container)?;

    if layout.shape != pixels.shape() {
        return Err(ConversionError::DimensionMismatch {
            expected: layout.shape,
            found: pixels.shape(),
        });
    }
    if layout.sample_format != SAMPLE_FORMAT_UINT {
        return Err(ConversionError::UnsupportedFormat(format!(
            "raw samples with SampleFormat {}",
            layout.sample_format
        )));
    }
    if layout.has_linearization_table {
        warn!("Raw image carries a LinearizationTable; readers will apply it to the new samples");
    }

    let order = container.byte_order();
    let mut output = container_bytes.to_vec();

    let mode = match layout.in_place_sample_size() {
        Some(sample_size) => {
            overwrite_in_place(&mut output, &layout, pixels, order, sample_size)?;
            SpliceMode::InPlace
        }
        None => {
            append_uncompressed(&mut output, &layout, pixels, order)?;
            SpliceMode::Rewritten
        }
    };

    debug!("Spliced {} into {} byte container ({:?})", pixels.shape(), output.len(), mode);
    Ok(SpliceOutcome {
        bytes: output,
        mode,
    })
}

fn overwrite_in_place(
    output: &mut [u8],
    layout: &RawLayout,
    pixels: &PixelBuffer,
    order: ByteOrder,
    sample_size: usize,
) -> Result<()> {
    let spp = pixels.samples_per_pixel();
    for (segment, geometry) in layout.segments.iter().zip(layout.geometry()?) {
        let needed = geometry
            .stored_size(spp, sample_size)
            .filter(|&size| size <= segment.byte_count)
            .ok_or_else(|| {
                ConversionError::MalformedContainer(format!(
                    "segment at offset {} holds {} bytes, less than its {}x{} area needs",
                    segment.offset, segment.byte_count, geometry.columns, geometry.rows
                ))
            })?;
        slice_at(output, segment.offset, needed)?;

        let encoded = encode_segment(pixels, &geometry, order, sample_size)?;
        output[segment.offset..segment.offset + encoded.len()].copy_from_slice(&encoded);
    }
    Ok(())
}

fn append_uncompressed(
    output: &mut Vec<u8>,
    layout: &RawLayout,
    pixels: &PixelBuffer,
    order: ByteOrder,
) -> Result<()> {
    let bits_entry = layout.bits_entry.as_ref().ok_or_else(|| {
        ConversionError::MalformedContainer("raw IFD lacks BitsPerSample".to_string())
    })?;

    let sample_size = usize::from(REWRITE_BITS_PER_SAMPLE / 8);
    let geometry = layout.geometry()?;
    // One padding byte per segment for word alignment.
    let appended = geometry.iter().try_fold(output.len(), |total, rect| {
        rect.stored_size(pixels.samples_per_pixel(), sample_size)
            .and_then(|size| total.checked_add(size)?.checked_add(1))
    });
    match appended {
        Some(total) if total <= u32::MAX as usize => {}
        _ => {
            return Err(ConversionError::UnsupportedFormat(
                "rewritten container would exceed 4 GiB".to_string(),
            ));
        }
    }

    let mut offsets = Vec::with_capacity(geometry.len());
    let mut byte_counts = Vec::with_capacity(geometry.len());

    for rect in &geometry {
        let encoded = encode_segment(pixels, rect, order, sample_size)?;
        offsets.push(append_aligned(output, &encoded)?);
        byte_counts.push(file_offset(encoded.len())?);
    }

    patch_entry(output, &layout.offsets_entry, field_types::LONG, &offsets, order)?;
    patch_entry(output, &layout.byte_counts_entry, field_types::LONG, &byte_counts, order)?;

    let bits = vec![REWRITE_BITS_PER_SAMPLE as u32; pixels.samples_per_pixel()];
    patch_entry(output, bits_entry, field_types::SHORT, &bits, order)?;

    if let Some(entry) = &layout.compression_entry {
        patch_entry(output, entry, field_types::SHORT, &[COMPRESSION_NONE], order)?;
    }
    if let Some(entry) = &layout.predictor_entry {
        patch_entry(output, entry, field_types::SHORT, &[PREDICTOR_NONE], order)?;
    }
    Ok(())
}

/// Serializes the samples covered by `rect`, zero-filling past the image edge.
fn encode_segment(
    pixels: &PixelBuffer,
    rect: &SegmentGeometry,
    order: ByteOrder,
    sample_size: usize,
) -> Result<Vec<u8>> {
    let spp = pixels.samples_per_pixel();
    let width = pixels.width();
    let height = pixels.height();
    let data = pixels.data();
    let size = rect.stored_size(spp, sample_size).ok_or_else(|| {
        ConversionError::MalformedContainer(format!(
            "segment of {}x{} samples overflows",
            rect.columns, rect.rows
        ))
    })?;
    let mut encoded = Vec::with_capacity(size);

    for y in rect.y..rect.y + rect.rows {
        for x in rect.x..rect.x + rect.columns {
            for s in 0..spp {
                let value = if x < width && y < height {
                    data[(y * width + x) * spp + s]
                } else {
                    0
                };
                if sample_size == 1 {
                    let byte = u8::try_from(value).map_err(|_| {
                        ConversionError::UnsupportedFormat(format!(
                            "sample {} at ({}, {}) does not fit the 8-bit payload",
                            value, x, y
                        ))
                    })?;
                    encoded.push(byte);
                } else {
                    encoded.extend_from_slice(&order.u16_bytes(value));
                }
            }
        }
    }
    Ok(encoded)
}

fn file_offset(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        ConversionError::UnsupportedFormat("container would exceed 4 GiB".to_string())
    })
}

/// Appends `data` at the next word boundary and returns where it starts.
fn append_aligned(output: &mut Vec<u8>, data: &[u8]) -> Result<u32> {
    if output.len() % 2 == 1 {
        output.push(0);
    }
    let offset = file_offset(output.len())?;
    output.extend_from_slice(data);
    file_offset(output.len())?;
    Ok(offset)
}

/// Rewrites an entry's type, count and values. Values that do not fit in
/// the 4-byte field are appended to the file; the old ones become unreferenced.
fn patch_entry(
    output: &mut Vec<u8>,
    entry: &IfdEntry,
    field_type: u16,
    values: &[u32],
    order: ByteOrder,
) -> Result<()> {
    let mut encoded = Vec::with_capacity(values.len() * 4);
    for &value in values {
        match field_type {
            field_types::SHORT => encoded.extend_from_slice(&order.u16_bytes(value as u16)),
            _ => encoded.extend_from_slice(&order.u32_bytes(value)),
        }
    }

    let value_field = if encoded.len() <= 4 {
        let mut field = [0u8; 4];
        field[..encoded.len()].copy_from_slice(&encoded);
        field
    } else {
        order.u32_bytes(append_aligned(output, &encoded)?)
    };

    let count = file_offset(values.len())?;
    let position = entry.position;
    slice_at(output, position, ENTRY_SIZE)?;
    output[position + 2..position + 4].copy_from_slice(&order.u16_bytes(field_type));
    output[position + 4..position + 8].copy_from_slice(&order.u32_bytes(count));
    output[position + 8..position + 12].copy_from_slice(&value_field);
    Ok(())
}
