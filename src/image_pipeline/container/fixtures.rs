//! Hand-built TIFF/DNG files for container tests.

use crate::image_pipeline::container::ifd::{ByteOrder, TiffContainer, field_types, tags};
use crate::image_pipeline::container::layout::RawLayout;

const CFA_REPEAT_PATTERN_DIM: u16 = 33421;
const CFA_PATTERN: u16 = 33422;
const MAKE: u16 = 271;
const DNG_VERSION: u16 = 50706;
const UNIQUE_CAMERA_MODEL: u16 = 50708;

pub(crate) struct FixtureEntry {
    pub tag: u16,
    pub field_type: u16,
    pub values: Vec<u32>,
}

pub(crate) fn entry(tag: u16, field_type: u16, values: &[u32]) -> FixtureEntry {
    FixtureEntry {
        tag,
        field_type,
        values: values.to_vec(),
    }
}

pub(crate) fn ascii(tag: u16, text: &str) -> FixtureEntry {
    let mut values: Vec<u32> = text.bytes().map(u32::from).collect();
    values.push(0);
    FixtureEntry {
        tag,
        field_type: field_types::ASCII,
        values,
    }
}

pub(crate) struct TiffBuilder {
    order: ByteOrder,
    bytes: Vec<u8>,
}

impl TiffBuilder {
    pub fn new(order: ByteOrder) -> Self {
        let mut bytes = match order {
            ByteOrder::LittleEndian => b"II".to_vec(),
            ByteOrder::BigEndian => b"MM".to_vec(),
        };
        bytes.extend_from_slice(&order.u16_bytes(42));
        bytes.extend_from_slice(&[0; 4]);
        Self { order, bytes }
    }

    fn align(&mut self) {
        if self.bytes.len() % 2 == 1 {
            self.bytes.push(0);
        }
    }

    pub fn append(&mut self, data: &[u8]) -> u32 {
        self.align();
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(data);
        offset
    }

    fn encode_values(&self, entry: &FixtureEntry) -> Vec<u8> {
        let mut encoded = Vec::new();
        for &value in &entry.values {
            match entry.field_type {
                field_types::SHORT => encoded.extend_from_slice(&self.order.u16_bytes(value as u16)),
                field_types::LONG | field_types::IFD => {
                    encoded.extend_from_slice(&self.order.u32_bytes(value))
                }
                _ => encoded.push(value as u8),
            }
        }
        encoded
    }

    /// Writes an IFD (entries sorted by tag) followed by its out-of-line values.
    pub fn append_ifd(&mut self, mut entries: Vec<FixtureEntry>) -> u32 {
        entries.sort_by_key(|entry| entry.tag);
        self.align();

        let ifd_offset = self.bytes.len();
        let mut data_cursor = ifd_offset + 2 + entries.len() * 12 + 4;
        let mut ifd = self.order.u16_bytes(entries.len() as u16).to_vec();
        let mut extra = Vec::new();

        for entry in &entries {
            let encoded = self.encode_values(entry);
            ifd.extend_from_slice(&self.order.u16_bytes(entry.tag));
            ifd.extend_from_slice(&self.order.u16_bytes(entry.field_type));
            ifd.extend_from_slice(&self.order.u32_bytes(entry.values.len() as u32));
            if encoded.len() <= 4 {
                let mut field = [0u8; 4];
                field[..encoded.len()].copy_from_slice(&encoded);
                ifd.extend_from_slice(&field);
            } else {
                ifd.extend_from_slice(&self.order.u32_bytes(data_cursor as u32));
                extra.extend_from_slice(&encoded);
                if extra.len() % 2 == 1 {
                    extra.push(0);
                }
                data_cursor = ifd_offset + 2 + entries.len() * 12 + 4 + extra.len();
            }
        }
        ifd.extend_from_slice(&[0; 4]);

        self.bytes.extend_from_slice(&ifd);
        self.bytes.extend_from_slice(&extra);
        ifd_offset as u32
    }

    /// Points the next-IFD field of the IFD at `from` to `to`.
    pub fn link(&mut self, from: u32, to: u32) {
        let from = from as usize;
        let count = self.order.u16_from([self.bytes[from], self.bytes[from + 1]]) as usize;
        let next = from + 2 + count * 12;
        let encoded = self.order.u32_bytes(to);
        self.bytes[next..next + 4].copy_from_slice(&encoded);
    }

    pub fn finish(mut self, first_ifd: u32) -> Vec<u8> {
        let encoded = self.order.u32_bytes(first_ifd);
        self.bytes[4..8].copy_from_slice(&encoded);
        self.bytes
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum FixtureLayout {
    Strips { rows_per_strip: u32 },
    Tiles { tile_width: u32, tile_length: u32 },
}

/// A DNG-shaped file: IFD0 is an RGB preview, the raw image sits in a SubIFD.
#[derive(Debug, Clone)]
pub(crate) struct RawFixture {
    pub order: ByteOrder,
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u32,
    pub bits: u16,
    pub compression: u16,
    pub predictor: Option<u16>,
    pub sample_format: Option<u16>,
    pub layout: FixtureLayout,
}

impl RawFixture {
    pub fn strips(order: ByteOrder, width: u32, height: u32, rows_per_strip: u32) -> Self {
        Self {
            order,
            width,
            height,
            samples_per_pixel: 1,
            bits: 16,
            compression: 1,
            predictor: None,
            sample_format: None,
            layout: FixtureLayout::Strips { rows_per_strip },
        }
    }

    pub fn tiles(order: ByteOrder, width: u32, height: u32, tile_width: u32, tile_length: u32) -> Self {
        Self {
            layout: FixtureLayout::Tiles { tile_width, tile_length },
            ..Self::strips(order, width, height, height)
        }
    }

    /// Marks the payload as compressed. Segments then hold opaque filler bytes.
    pub fn compressed(mut self, compression: u16, bits: u16) -> Self {
        self.compression = compression;
        self.bits = bits;
        self.predictor = Some(2);
        self
    }

    pub fn with_bits(mut self, bits: u16) -> Self {
        self.bits = bits;
        self
    }

    /// More than one sample per pixel makes the raw image LinearRaw.
    pub fn with_samples_per_pixel(mut self, samples_per_pixel: u32) -> Self {
        self.samples_per_pixel = samples_per_pixel;
        self
    }

    pub fn with_sample_format(mut self, sample_format: u16) -> Self {
        self.sample_format = Some(sample_format);
        self
    }

    fn rects(&self) -> Vec<(u32, u32, u32, u32)> {
        match self.layout {
            FixtureLayout::Strips { rows_per_strip } => (0..self.height.div_ceil(rows_per_strip))
                .map(|i| {
                    let y = i * rows_per_strip;
                    (0, y, self.width, rows_per_strip.min(self.height - y))
                })
                .collect(),
            FixtureLayout::Tiles { tile_width, tile_length } => {
                let across = self.width.div_ceil(tile_width);
                let down = self.height.div_ceil(tile_length);
                (0..across * down)
                    .map(|i| ((i % across) * tile_width, (i / across) * tile_length, tile_width, tile_length))
                    .collect()
            }
        }
    }

    fn encode_rect(&self, samples: &[u16], (x0, y0, columns, rows): (u32, u32, u32, u32)) -> Vec<u8> {
        let spp = self.samples_per_pixel;
        let mut encoded = Vec::new();
        for y in y0..y0 + rows {
            for x in x0..x0 + columns {
                for s in 0..spp {
                    let value = if x < self.width && y < self.height {
                        samples[((y * self.width + x) * spp + s) as usize]
                    } else {
                        0
                    };
                    if self.bits == 8 {
                        encoded.push(value as u8);
                    } else {
                        encoded.extend_from_slice(&self.order.u16_bytes(value));
                    }
                }
            }
        }
        encoded
    }

    pub fn build(&self, samples: &[u16]) -> Vec<u8> {
        let mut builder = TiffBuilder::new(self.order);

        let preview = builder.append(&[10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120]);

        let (offsets, byte_counts): (Vec<u32>, Vec<u32>) = self
            .rects()
            .into_iter()
            .map(|rect| {
                let payload = if self.compression == 1 {
                    self.encode_rect(samples, rect)
                } else {
                    vec![0xAB; 7]
                };
                (builder.append(&payload), payload.len() as u32)
            })
            .unzip();

        let photometric = if self.samples_per_pixel == 1 { 32803 } else { 34892 };
        let mut raw_entries = vec![
            entry(tags::NEW_SUBFILE_TYPE, field_types::LONG, &[0]),
            entry(tags::IMAGE_WIDTH, field_types::LONG, &[self.width]),
            entry(tags::IMAGE_LENGTH, field_types::LONG, &[self.height]),
            entry(
                tags::BITS_PER_SAMPLE,
                field_types::SHORT,
                &vec![self.bits as u32; self.samples_per_pixel as usize],
            ),
            entry(tags::COMPRESSION, field_types::SHORT, &[self.compression as u32]),
            entry(tags::PHOTOMETRIC_INTERPRETATION, field_types::SHORT, &[photometric]),
            entry(tags::SAMPLES_PER_PIXEL, field_types::SHORT, &[self.samples_per_pixel]),
            entry(tags::PLANAR_CONFIGURATION, field_types::SHORT, &[1]),
            entry(CFA_REPEAT_PATTERN_DIM, field_types::SHORT, &[2, 2]),
            entry(CFA_PATTERN, field_types::BYTE, &[0, 1, 1, 2]),
        ];
        match self.layout {
            FixtureLayout::Strips { rows_per_strip } => {
                raw_entries.push(entry(tags::ROWS_PER_STRIP, field_types::LONG, &[rows_per_strip]));
                raw_entries.push(entry(tags::STRIP_OFFSETS, field_types::LONG, &offsets));
                raw_entries.push(entry(tags::STRIP_BYTE_COUNTS, field_types::LONG, &byte_counts));
            }
            FixtureLayout::Tiles { tile_width, tile_length } => {
                raw_entries.push(entry(tags::TILE_WIDTH, field_types::LONG, &[tile_width]));
                raw_entries.push(entry(tags::TILE_LENGTH, field_types::LONG, &[tile_length]));
                raw_entries.push(entry(tags::TILE_OFFSETS, field_types::LONG, &offsets));
                raw_entries.push(entry(tags::TILE_BYTE_COUNTS, field_types::LONG, &byte_counts));
            }
        }
        if let Some(predictor) = self.predictor {
            raw_entries.push(entry(tags::PREDICTOR, field_types::SHORT, &[predictor as u32]));
        }
        if let Some(sample_format) = self.sample_format {
            raw_entries.push(entry(
                tags::SAMPLE_FORMAT,
                field_types::SHORT,
                &vec![sample_format as u32; self.samples_per_pixel as usize],
            ));
        }
        let raw_ifd = builder.append_ifd(raw_entries);

        let ifd0 = builder.append_ifd(vec![
            entry(tags::NEW_SUBFILE_TYPE, field_types::LONG, &[1]),
            entry(tags::IMAGE_WIDTH, field_types::LONG, &[2]),
            entry(tags::IMAGE_LENGTH, field_types::LONG, &[2]),
            entry(tags::BITS_PER_SAMPLE, field_types::SHORT, &[8, 8, 8]),
            entry(tags::COMPRESSION, field_types::SHORT, &[1]),
            entry(tags::PHOTOMETRIC_INTERPRETATION, field_types::SHORT, &[2]),
            ascii(MAKE, "Fixture"),
            entry(tags::STRIP_OFFSETS, field_types::LONG, &[preview]),
            entry(tags::SAMPLES_PER_PIXEL, field_types::SHORT, &[3]),
            entry(tags::ROWS_PER_STRIP, field_types::LONG, &[2]),
            entry(tags::STRIP_BYTE_COUNTS, field_types::LONG, &[12]),
            entry(tags::SUB_IFDS, field_types::LONG, &[raw_ifd]),
            entry(DNG_VERSION, field_types::BYTE, &[1, 4, 0, 0]),
            ascii(UNIQUE_CAMERA_MODEL, "Fixture Camera"),
        ]);

        builder.finish(ifd0)
    }
}

/// Samples `1..=count`, wrapped below `limit`, so no sample is zero.
pub(crate) fn ramp(count: usize, limit: u16) -> Vec<u16> {
    (0..count).map(|i| (i % (limit as usize - 1)) as u16 + 1).collect()
}

/// Decodes an uncompressed 8- or 16-bit raw payload back into samples.
pub(crate) fn read_raw_samples(bytes: &[u8]) -> Vec<u16> {
    let container = TiffContainer::parse(bytes).unwrap();
    let layout = RawLayout::locate(&container).unwrap();
    let order = container.byte_order();
    let shape = layout.shape;
    let sample_size = layout.in_place_sample_size().expect("uncompressed payload");
    let mut samples = vec![0u16; shape.sample_count()];

    for (segment, rect) in layout.segments.iter().zip(layout.geometry().unwrap()) {
        let mut cursor = segment.offset;
        for y in rect.y..rect.y + rect.rows {
            for x in rect.x..rect.x + rect.columns {
                for s in 0..shape.samples_per_pixel {
                    let value = if sample_size == 1 {
                        bytes[cursor] as u16
                    } else {
                        order.u16_from([bytes[cursor], bytes[cursor + 1]])
                    };
                    cursor += sample_size;
                    if x < shape.width && y < shape.height {
                        samples[(y * shape.width + x) * shape.samples_per_pixel + s] = value;
                    }
                }
            }
        }
    }
    samples
}
