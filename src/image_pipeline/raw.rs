//! RAW image reading module
//!
//! This module provides format-agnostic pixel buffer reading capabilities.

mod reader;
mod rawloader_reader;
pub mod types;

pub use reader::PixelReader;
pub use rawloader_reader::RawLoaderReader;
pub use types::{PixelBuffer, Shape};
