use std::io::Cursor;

use tiff::decoder::Decoder;
use tiff::tags::Tag;

use crate::image_pipeline::common::config::PipelineConfig;
use crate::image_pipeline::common::error::ConversionError;
use crate::image_pipeline::raw::PixelReader;
use crate::image_pipeline::raw::types::PixelBuffer;
use crate::image_pipeline::tiff::types::TiffCompression;
use crate::image_pipeline::tiff::{StandardTiffWriter, TiffPixelReader, TiffWriter};

fn encode(image: &PixelBuffer, config: &PipelineConfig) -> Vec<u8> {
    let mut output = Vec::new();
    StandardTiffWriter.write_tiff(image, &mut output, config).unwrap();
    output
}

#[test]
fn test_default_output_is_uncompressed_gray16() {
    let image = PixelBuffer::new(4, 2, 1, 14, vec![0, 1, 2, 3, 16380, 16381, 16382, 16383]).unwrap();
    let bytes = encode(&image, &PipelineConfig::default());

    let mut decoder = Decoder::new(Cursor::new(&bytes)).unwrap();
    assert_eq!(decoder.get_tag_u32(Tag::Compression).unwrap(), 1);
    assert_eq!(decoder.get_tag_u32(Tag::BitsPerSample).unwrap(), 16);
    assert_eq!(decoder.get_tag_u32(Tag::PhotometricInterpretation).unwrap(), 1);

    let read_back = TiffPixelReader.read_pixels(&bytes).unwrap();
    assert_eq!(read_back.shape(), image.shape());
    assert_eq!(read_back.bits_per_sample(), 16);
    assert_eq!(read_back.data(), image.data());
}

#[test]
fn test_narrow_buffers_are_stored_as_8_bit() {
    let image = PixelBuffer::new(3, 1, 1, 8, vec![0, 128, 255]).unwrap();
    let bytes = encode(&image, &PipelineConfig::default());

    let mut decoder = Decoder::new(Cursor::new(&bytes)).unwrap();
    assert_eq!(decoder.get_tag_u32(Tag::BitsPerSample).unwrap(), 8);

    let read_back = TiffPixelReader.read_pixels(&bytes).unwrap();
    assert_eq!(read_back.bits_per_sample(), 8);
    assert_eq!(read_back.data(), &[0, 128, 255]);
}

#[test]
fn test_rgb_buffers_keep_three_samples() {
    let image = PixelBuffer::new(2, 1, 3, 16, vec![1, 2, 3, 65533, 65534, 65535]).unwrap();
    let bytes = encode(&image, &PipelineConfig::default());

    let read_back = TiffPixelReader.read_pixels(&bytes).unwrap();
    assert_eq!(read_back.samples_per_pixel(), 3);
    assert_eq!(read_back.data(), image.data());
}

#[test]
fn test_compressed_output_still_decodes() {
    let image = PixelBuffer::from_samples(16, 16, (0..256).map(|v| v * 200).collect()).unwrap();
    let config = PipelineConfig::builder()
        .compression(TiffCompression::DeflateBalanced)
        .predictor(Some(2))
        .build();
    let bytes = encode(&image, &config);

    let read_back = TiffPixelReader.read_pixels(&bytes).unwrap();
    assert_eq!(read_back.data(), image.data());
}

#[test]
fn test_two_channel_buffers_are_rejected() {
    let image = PixelBuffer::new(1, 1, 2, 16, vec![1, 2]).unwrap();
    let mut output = Vec::new();
    let result = StandardTiffWriter.write_tiff(&image, &mut output, &PipelineConfig::default());

    assert!(matches!(result, Err(ConversionError::UnsupportedFormat(_))));
    assert!(output.is_empty());
}

#[test]
fn test_reader_rejects_non_tiff() {
    let result = TiffPixelReader.read_pixels(b"not a tiff");
    assert!(matches!(result, Err(ConversionError::DecodeError(_))));
}
