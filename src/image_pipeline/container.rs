//! TIFF/DNG container module
//!
//! Locates the raw image inside a TIFF-based container and swaps its pixel
//! payload while leaving every other byte alone.

pub mod ifd;
pub mod layout;
mod splice;

#[cfg(test)]
pub(crate) mod fixtures;

pub use ifd::{ByteOrder, TiffContainer};
pub use layout::RawLayout;
pub use splice::{SpliceMode, SpliceOutcome, splice_pixels};
