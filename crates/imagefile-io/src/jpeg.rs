//! JPEG format support.
//!
//! Lossy 8-bit RGB. Writing uses 4:4:4 sampling so flat colors survive
//! at high quality; alpha is discarded. Grayscale and CMYK files decode
//! to RGB.

use crate::traits::{
    CodecCapabilities, DecodedImage, EncodeEntry, ImageCodec, check_dimensions, check_layout,
    decoded_attributes, native_pixels, single_image, warn_unstored,
};
use crate::{Format, IoError, IoResult, ReadOptions, WriteOptions};
use imagefile_core::{ColorEncoding, Image, PixelFormat};
use std::io::Cursor;
use tracing::debug;

static CAPABILITIES: CodecCapabilities = CodecCapabilities {
    native_channels: 3,
    native_format: PixelFormat::UInt8,
    native_encoding: ColorEncoding::Srgb,
    supports_alpha: false,
    multi_image: false,
    lossy: true,
    output_formats: &[PixelFormat::UInt8],
};

/// JPEG backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegCodec;

impl ImageCodec for JpegCodec {
    fn format(&self) -> Format {
        Format::Jpeg
    }

    fn capabilities(&self) -> &'static CodecCapabilities {
        &CAPABILITIES
    }

    fn encode(&self, images: &[EncodeEntry<'_>], options: &WriteOptions) -> IoResult<Vec<u8>> {
        use jpeg_encoder::{ColorType, Encoder, SamplingFactor};

        let entry = single_image(images, Format::Jpeg)?;
        check_layout(entry.image)?;
        check_dimensions(entry.image, u16::MAX as usize, Format::Jpeg)?;
        CAPABILITIES.output_format(options.output_format)?;
        warn_unstored(entry.attributes, &[], Format::Jpeg);

        let (width, height) = entry.image.dimensions();
        let pixels: Vec<u8> = native_pixels(entry, 3, &CAPABILITIES, options);

        let mut buffer = Vec::new();
        let mut encoder = Encoder::new(&mut buffer, options.jpeg_quality.clamp(1, 100));
        encoder.set_sampling_factor(SamplingFactor::F_1_1);
        encoder
            .encode(&pixels, width as u16, height as u16, ColorType::Rgb)
            .map_err(|e: jpeg_encoder::EncodingError| IoError::EncodeError(e.to_string()))?;

        debug!(width, height, quality = options.jpeg_quality, bytes = buffer.len(), "encoded JPEG");
        Ok(buffer)
    }

    fn decode(&self, data: &[u8], options: &ReadOptions) -> IoResult<DecodedImage> {
        let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(data));
        let pixels = decoder
            .decode()
            .map_err(|e| IoError::DecodeError(e.to_string()))?;
        let info = decoder
            .info()
            .ok_or_else(|| IoError::DecodeError("missing JPEG info".into()))?;

        let rgb = to_rgb(info.pixel_format, pixels);
        let image = Image::from_interleaved(
            info.width as usize,
            info.height as usize,
            options.tile_width,
            options.tile_height,
            3,
            &rgb,
        )?;

        Ok(DecodedImage {
            image,
            attributes: decoded_attributes(ColorEncoding::Srgb),
        })
    }
}

fn to_rgb(format: jpeg_decoder::PixelFormat, pixels: Vec<u8>) -> Vec<u8> {
    match format {
        jpeg_decoder::PixelFormat::RGB24 => pixels,
        jpeg_decoder::PixelFormat::L8 => pixels.iter().flat_map(|&g| [g, g, g]).collect(),
        // 16-bit gray is big-endian; keep the high byte
        jpeg_decoder::PixelFormat::L16 => pixels
            .chunks_exact(2)
            .flat_map(|l| [l[0], l[0], l[0]])
            .collect(),
        jpeg_decoder::PixelFormat::CMYK32 => pixels
            .chunks_exact(4)
            .flat_map(|cmyk| {
                let k = 1.0 - cmyk[3] as f32 / 255.0;
                let ink = |v: u8| ((1.0 - v as f32 / 255.0) * k * 255.0).round() as u8;
                [ink(cmyk[0]), ink(cmyk[1]), ink(cmyk[2])]
            })
            .collect(),
    }
}
