//! Minimal TIFF structure reader.
//!
//! Only the header, IFD chains and SubIFD trees are interpreted. Entries are
//! kept with their absolute file position so they can be patched in place.

use std::collections::HashSet;

use crate::image_pipeline::common::error::{ConversionError, Result};

pub mod tags {
    pub const NEW_SUBFILE_TYPE: u16 = 254;
    pub const IMAGE_WIDTH: u16 = 256;
    pub const IMAGE_LENGTH: u16 = 257;
    pub const BITS_PER_SAMPLE: u16 = 258;
    pub const COMPRESSION: u16 = 259;
    pub const PHOTOMETRIC_INTERPRETATION: u16 = 262;
    pub const STRIP_OFFSETS: u16 = 273;
    pub const SAMPLES_PER_PIXEL: u16 = 277;
    pub const ROWS_PER_STRIP: u16 = 278;
    pub const STRIP_BYTE_COUNTS: u16 = 279;
    pub const PLANAR_CONFIGURATION: u16 = 284;
    pub const PREDICTOR: u16 = 317;
    pub const TILE_WIDTH: u16 = 322;
    pub const TILE_LENGTH: u16 = 323;
    pub const TILE_OFFSETS: u16 = 324;
    pub const TILE_BYTE_COUNTS: u16 = 325;
    pub const SUB_IFDS: u16 = 330;
    pub const SAMPLE_FORMAT: u16 = 339;
    pub const LINEARIZATION_TABLE: u16 = 50712;
}

pub mod field_types {
    pub const BYTE: u16 = 1;
    pub const ASCII: u16 = 2;
    pub const SHORT: u16 = 3;
    pub const LONG: u16 = 4;
    pub const RATIONAL: u16 = 5;
    pub const SBYTE: u16 = 6;
    pub const UNDEFINED: u16 = 7;
    pub const SSHORT: u16 = 8;
    pub const SLONG: u16 = 9;
    pub const SRATIONAL: u16 = 10;
    pub const FLOAT: u16 = 11;
    pub const DOUBLE: u16 = 12;
    pub const IFD: u16 = 13;

    /// Size in bytes of one value of `field_type`, `None` for unknown types.
    pub fn size_of(field_type: u16) -> Option<usize> {
        match field_type {
            BYTE | ASCII | SBYTE | UNDEFINED => Some(1),
            SHORT | SSHORT => Some(2),
            LONG | SLONG | FLOAT | IFD => Some(4),
            RATIONAL | SRATIONAL | DOUBLE => Some(8),
            _ => None,
        }
    }
}

/// Classic TIFF header magic.
const TIFF_MAGIC: u16 = 42;
/// Size of one IFD entry: tag, type, count, value/offset.
pub const ENTRY_SIZE: usize = 12;
/// Entries whose values fit in this many bytes store them inline.
const INLINE_VALUE_SIZE: usize = 4;
/// Bound on how many IFDs a single file may declare.
const MAX_IFDS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    pub fn u16_from(self, bytes: [u8; 2]) -> u16 {
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(bytes),
            ByteOrder::BigEndian => u16::from_be_bytes(bytes),
        }
    }

    pub fn u32_from(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(bytes),
            ByteOrder::BigEndian => u32::from_be_bytes(bytes),
        }
    }

    pub fn u16_bytes(self, value: u16) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        }
    }

    pub fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        }
    }

    pub fn read_u16(self, bytes: &[u8], offset: usize) -> Result<u16> {
        let slice = slice_at(bytes, offset, 2)?;
        Ok(self.u16_from([slice[0], slice[1]]))
    }

    pub fn read_u32(self, bytes: &[u8], offset: usize) -> Result<u32> {
        let slice = slice_at(bytes, offset, 4)?;
        Ok(self.u32_from([slice[0], slice[1], slice[2], slice[3]]))
    }
}

/// Bounds-checked `&bytes[offset..offset + len]`.
pub fn slice_at(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| bytes.get(offset..end))
        .ok_or_else(|| {
            ConversionError::MalformedContainer(format!(
                "{} bytes at offset {} run past end of file ({} bytes)",
                len,
                offset,
                bytes.len()
            ))
        })
}

/// One 12-byte IFD entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    pub tag: u16,
    pub field_type: u16,
    pub count: u32,
    /// Raw value/offset field, still in file byte order
    pub value_field: [u8; 4],
    /// Absolute file offset of the entry itself
    pub position: usize,
}

impl IfdEntry {
    /// Byte length of the entry's values, `None` for unknown field types.
    pub fn value_len(&self) -> Option<usize> {
        field_types::size_of(self.field_type).map(|size| size * self.count as usize)
    }

    pub fn is_inline(&self) -> bool {
        self.value_len().is_some_and(|len| len <= INLINE_VALUE_SIZE)
    }

    /// File range of out-of-line values, `None` when they are stored inline.
    pub fn data_range(&self, order: ByteOrder) -> Option<(usize, usize)> {
        let len = self.value_len()?;
        if len <= INLINE_VALUE_SIZE {
            return None;
        }
        Some((order.u32_from(self.value_field) as usize, len))
    }

    /// Integer values of a BYTE, SHORT, LONG or IFD entry.
    pub fn values(&self, bytes: &[u8], order: ByteOrder) -> Result<Vec<u32>> {
        let size = match self.field_type {
            field_types::BYTE => 1,
            field_types::SHORT => 2,
            field_types::LONG | field_types::IFD => 4,
            other => {
                return Err(ConversionError::MalformedContainer(format!(
                    "tag {} has non-integer field type {}",
                    self.tag, other
                )));
            }
        };
        let count = self.count as usize;
        let raw = match self.data_range(order) {
            None => &self.value_field[..size * count],
            Some((offset, len)) => slice_at(bytes, offset, len)?,
        };

        Ok(raw
            .chunks_exact(size)
            .map(|chunk| match size {
                1 => chunk[0] as u32,
                2 => order.u16_from([chunk[0], chunk[1]]) as u32,
                _ => order.u32_from([chunk[0], chunk[1], chunk[2], chunk[3]]),
            })
            .collect())
    }

    pub fn first_value(&self, bytes: &[u8], order: ByteOrder) -> Result<u32> {
        self.values(bytes, order)?.first().copied().ok_or_else(|| {
            ConversionError::MalformedContainer(format!("tag {} has no values", self.tag))
        })
    }
}

/// A parsed image file directory.
#[derive(Debug, Clone)]
pub struct Ifd {
    pub offset: usize,
    pub entries: Vec<IfdEntry>,
    /// Nesting depth, 0 for the main chain
    pub depth: usize,
}

impl Ifd {
    pub fn find(&self, tag: u16) -> Option<&IfdEntry> {
        self.entries.iter().find(|entry| entry.tag == tag)
    }
}

/// Every IFD of a classic (non-Big) TIFF, main chain first, SubIFDs after their parent.
#[derive(Debug)]
pub struct TiffContainer<'a> {
    bytes: &'a [u8],
    byte_order: ByteOrder,
    ifds: Vec<Ifd>,
}

impl<'a> TiffContainer<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let byte_order = match slice_at(bytes, 0, 2)? {
            b"II" => ByteOrder::LittleEndian,
            b"MM" => ByteOrder::BigEndian,
            _ => {
                return Err(ConversionError::MalformedContainer(
                    "missing TIFF byte order mark".to_string(),
                ));
            }
        };

        let magic = byte_order.read_u16(bytes, 2)?;
        if magic != TIFF_MAGIC {
            return Err(ConversionError::MalformedContainer(format!(
                "expected TIFF magic 42, found {}",
                magic
            )));
        }

        let mut container = Self {
            bytes,
            byte_order,
            ifds: Vec::new(),
        };
        let mut visited = HashSet::new();
        let first = byte_order.read_u32(bytes, 4)? as usize;
        container.read_chain(first, 0, &mut visited)?;

        if container.ifds.is_empty() {
            return Err(ConversionError::MalformedContainer(
                "file declares no IFDs".to_string(),
            ));
        }
        Ok(container)
    }

    fn read_chain(&mut self, mut offset: usize, depth: usize, visited: &mut HashSet<usize>) -> Result<()> {
        while offset != 0 {
            if !visited.insert(offset) {
                return Err(ConversionError::MalformedContainer(format!(
                    "IFD at offset {} is referenced more than once",
                    offset
                )));
            }
            if visited.len() > MAX_IFDS {
                return Err(ConversionError::MalformedContainer(format!(
                    "more than {} IFDs",
                    MAX_IFDS
                )));
            }

            let ifd = self.read_ifd(offset, depth)?;
            let next = ifd.entries.len() * ENTRY_SIZE + offset + 2;
            let sub_ifds = match ifd.find(tags::SUB_IFDS) {
                Some(entry) => entry.values(self.bytes, self.byte_order)?,
                None => Vec::new(),
            };
            self.ifds.push(ifd);

            for sub_ifd in sub_ifds {
                self.read_chain(sub_ifd as usize, depth + 1, visited)?;
            }

            offset = self.byte_order.read_u32(self.bytes, next)? as usize;
        }
        Ok(())
    }

    fn read_ifd(&self, offset: usize, depth: usize) -> Result<Ifd> {
        let count = self.byte_order.read_u16(self.bytes, offset)? as usize;
        let entries = (0..count)
            .map(|i| {
                let position = offset + 2 + i * ENTRY_SIZE;
                let raw = slice_at(self.bytes, position, ENTRY_SIZE)?;
                Ok(IfdEntry {
                    tag: self.byte_order.u16_from([raw[0], raw[1]]),
                    field_type: self.byte_order.u16_from([raw[2], raw[3]]),
                    count: self.byte_order.u32_from([raw[4], raw[5], raw[6], raw[7]]),
                    value_field: [raw[8], raw[9], raw[10], raw[11]],
                    position,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Ifd {
            offset,
            entries,
            depth,
        })
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn ifds(&self) -> &[Ifd] {
        &self.ifds
    }

    /// First integer value of `tag` in `ifd`, or `default` when the tag is absent.
    pub fn value_or(&self, ifd: &Ifd, tag: u16, default: u32) -> Result<u32> {
        match ifd.find(tag) {
            Some(entry) => entry.first_value(self.bytes, self.byte_order),
            None => Ok(default),
        }
    }

    /// First integer value of a tag that must be present.
    pub fn required(&self, ifd: &Ifd, tag: u16) -> Result<u32> {
        ifd.find(tag)
            .ok_or_else(|| {
                ConversionError::MalformedContainer(format!(
                    "IFD at offset {} lacks required tag {}",
                    ifd.offset, tag
                ))
            })?
            .first_value(self.bytes, self.byte_order)
    }

    pub fn values(&self, entry: &IfdEntry) -> Result<Vec<u32>> {
        entry.values(self.bytes, self.byte_order)
    }
}
