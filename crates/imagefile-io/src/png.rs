//! PNG format support.
//!
//! Writes 8-bit (default) or 16-bit RGBA with an sRGB chunk. Attributes
//! go to `tEXt` chunks; `software`, `author` and `comment` use the
//! registered `Software`, `Author` and `Comment` keywords, other keys are
//! written verbatim.
//!
//! Reading expands palette, low bit depth and `tRNS` transparency, so every
//! file decodes to 8 or 16-bit RGB or RGBA.

use crate::traits::{
    CodecCapabilities, DecodedImage, EncodeEntry, ImageCodec, check_dimensions, check_layout,
    decoded_attributes, native_pixels, single_image,
};
use crate::{Format, IoError, IoResult, ReadOptions, WriteOptions};
use imagefile_core::attributes::{AUTHOR, COLOR_SPACE, COMMENT, SOFTWARE};
use imagefile_core::{ColorEncoding, Image, ImageAttributes, PixelFormat};
use std::io::Cursor;
use tracing::{debug, warn};

static CAPABILITIES: CodecCapabilities = CodecCapabilities {
    native_channels: 4,
    native_format: PixelFormat::UInt8,
    native_encoding: ColorEncoding::Srgb,
    supports_alpha: true,
    multi_image: false,
    lossy: false,
    output_formats: &[PixelFormat::UInt8, PixelFormat::UInt16],
};

/// Attribute key to registered PNG keyword.
const KEYWORDS: [(&str, &str); 3] = [
    (SOFTWARE, "Software"),
    (AUTHOR, "Author"),
    (COMMENT, "Comment"),
];

/// PNG backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngCodec;

impl ImageCodec for PngCodec {
    fn format(&self) -> Format {
        Format::Png
    }

    fn capabilities(&self) -> &'static CodecCapabilities {
        &CAPABILITIES
    }

    fn encode(&self, images: &[EncodeEntry<'_>], options: &WriteOptions) -> IoResult<Vec<u8>> {
        let entry = single_image(images, Format::Png)?;
        check_layout(entry.image)?;
        check_dimensions(entry.image, u32::MAX as usize, Format::Png)?;
        let format = CAPABILITIES.output_format(options.output_format)?;

        let (width, height) = entry.image.dimensions();
        let (depth, data) = match format {
            PixelFormat::UInt16 => {
                let pixels: Vec<u16> = native_pixels(entry, 4, &CAPABILITIES, options);
                let bytes = pixels.iter().flat_map(|v| v.to_be_bytes()).collect();
                (png::BitDepth::Sixteen, bytes)
            }
            _ => (
                png::BitDepth::Eight,
                native_pixels::<u8>(entry, 4, &CAPABILITIES, options),
            ),
        };

        let mut out = Vec::new();
        let mut encoder = png::Encoder::new(&mut out, width as u32, height as u32);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(depth);
        encoder.set_compression(png::Compression::default());
        encoder.set_source_srgb(png::SrgbRenderingIntent::Perceptual);

        for (keyword, text) in text_chunks(entry.attributes) {
            encoder
                .add_text_chunk(keyword, text)
                .map_err(|e| IoError::EncodeError(e.to_string()))?;
        }

        let mut writer = encoder
            .write_header()
            .map_err(|e| IoError::EncodeError(e.to_string()))?;
        writer
            .write_image_data(&data)
            .map_err(|e| IoError::EncodeError(e.to_string()))?;
        writer
            .finish()
            .map_err(|e| IoError::EncodeError(e.to_string()))?;

        debug!(width, height, %format, bytes = out.len(), "encoded PNG");
        Ok(out)
    }

    fn decode(&self, data: &[u8], options: &ReadOptions) -> IoResult<DecodedImage> {
        let mut decoder = png::Decoder::new(Cursor::new(data));
        decoder.set_transformations(png::Transformations::EXPAND);
        let mut reader = decoder
            .read_info()
            .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;

        let buf_size = reader
            .output_buffer_size()
            .ok_or_else(|| IoError::DecodeError("cannot determine output buffer size".into()))?;
        let mut buf = vec![0u8; buf_size];
        let info = reader
            .next_frame(&mut buf)
            .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;
        buf.truncate(info.buffer_size());

        let width = info.width as usize;
        let height = info.height as usize;
        let (tw, th) = (options.tile_width, options.tile_height);

        let channels = match info.color_type {
            png::ColorType::Grayscale | png::ColorType::Rgb => 3,
            png::ColorType::GrayscaleAlpha | png::ColorType::Rgba => 4,
            png::ColorType::Indexed => {
                return Err(IoError::DecodeError("palette was not expanded".into()));
            }
        };
        let gray = matches!(
            info.color_type,
            png::ColorType::Grayscale | png::ColorType::GrayscaleAlpha
        );

        let image = match info.bit_depth {
            png::BitDepth::Sixteen => {
                let samples: Vec<u16> = buf
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                let samples = if gray { gray_to_rgb(&samples, channels) } else { samples };
                Image::from_interleaved(width, height, tw, th, channels, &samples)?
            }
            png::BitDepth::Eight => {
                let samples = if gray { gray_to_rgb(&buf, channels) } else { buf };
                Image::from_interleaved(width, height, tw, th, channels, &samples)?
            }
            depth => {
                return Err(IoError::UnsupportedPixelLayout(format!(
                    "PNG bit depth {depth:?} after expansion"
                )));
            }
        };

        let mut attributes = decoded_attributes(ColorEncoding::Srgb);
        for chunk in &reader.info().uncompressed_latin1_text {
            let key = KEYWORDS
                .iter()
                .find(|(_, keyword)| *keyword == chunk.keyword)
                .map_or(chunk.keyword.as_str(), |(key, _)| *key);
            attributes.insert(key, chunk.text.as_str());
        }

        Ok(DecodedImage { image, attributes })
    }
}

/// Attributes representable as `tEXt` chunks.
fn text_chunks(attributes: &ImageAttributes) -> Vec<(String, String)> {
    let mut chunks = Vec::new();
    for (key, value) in attributes.iter() {
        if key == COLOR_SPACE {
            continue;
        }
        let keyword = KEYWORDS
            .iter()
            .find(|(k, _)| *k == key)
            .map_or(key, |(_, keyword)| *keyword);
        let text = value.to_string();

        let keyword_ok = (1..=79).contains(&keyword.len())
            && keyword.chars().all(|c| (' '..='~').contains(&c));
        let text_ok = text.chars().all(|c| (c as u32) < 256);
        if keyword_ok && text_ok {
            chunks.push((keyword.to_string(), text));
        } else {
            warn!(key, "attribute not representable as PNG tEXt");
        }
    }
    chunks
}

/// Expands gray or gray+alpha samples to RGB or RGBA.
fn gray_to_rgb<T: Copy>(samples: &[T], channels: usize) -> Vec<T> {
    match channels {
        4 => samples
            .chunks_exact(2)
            .flat_map(|ga| [ga[0], ga[0], ga[0], ga[1]])
            .collect(),
        _ => samples.iter().flat_map(|&g| [g, g, g]).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagefile_core::{Color3b, Color4b};

    fn encode_with(image: &Image, attributes: &ImageAttributes, options: &WriteOptions) -> Vec<u8> {
        let entry = EncodeEntry { image, attributes };
        PngCodec.encode(&[entry], options).unwrap()
    }

    #[test]
    fn test_roundtrip_rgba8() {
        let mut image = Image::new(5, 3, 4, 4, 4, PixelFormat::UInt8).unwrap();
        for y in 0..3 {
            for x in 0..5 {
                image.set_pixel(x, y, Color4b::new((x * 40) as u8, (y * 80) as u8, 7, 200));
            }
        }
        let bytes = encode_with(&image, &ImageAttributes::new(), &WriteOptions::default());
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));

        let decoded = PngCodec.decode(&bytes, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.image.dimensions(), (5, 3));
        assert_eq!(decoded.image.channel_count(), 4);
        assert_eq!(decoded.image.pixel_format(), PixelFormat::UInt8);
        assert_eq!(decoded.image.get_pixel::<u8, 4>(4, 2), Color4b::new(160, 160, 7, 200));
        assert_eq!(decoded.attributes.get_str(COLOR_SPACE), Some("sRGB"));
    }

    #[test]
    fn test_rgb_gets_opaque_alpha() {
        let mut image = Image::new(2, 2, 2, 2, 3, PixelFormat::UInt8).unwrap();
        image.clear(Color3b::new(1, 2, 3));
        let bytes = encode_with(&image, &ImageAttributes::new(), &WriteOptions::default());

        let decoded = PngCodec.decode(&bytes, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.image.get_pixel::<u8, 4>(0, 0), Color4b::new(1, 2, 3, 255));
    }

    #[test]
    fn test_sixteen_bit_output() {
        let mut image = Image::new(2, 1, 2, 1, 4, PixelFormat::UInt16).unwrap();
        image.set_pixel(0, 0, imagefile_core::Color::<u16, 4>::new(1, 258, 65535, 32768));
        image.set_pixel(1, 0, imagefile_core::Color::<u16, 4>::new(0, 0, 0, 0));

        let options = WriteOptions::default().with_output_format(PixelFormat::UInt16);
        let bytes = encode_with(&image, &ImageAttributes::new(), &options);

        let decoded = PngCodec.decode(&bytes, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.image.pixel_format(), PixelFormat::UInt16);
        assert_eq!(
            decoded.image.get_pixel::<u16, 4>(0, 0),
            imagefile_core::Color::<u16, 4>::new(1, 258, 65535, 32768)
        );
    }

    #[test]
    fn test_text_chunks_roundtrip() {
        let image = Image::new(1, 1, 1, 1, 4, PixelFormat::UInt8).unwrap();
        let mut attrs = ImageAttributes::new();
        attrs.insert(SOFTWARE, "imagefile test");
        attrs.insert(AUTHOR, "someone");
        attrs.insert("Title", "flat");
        attrs.insert(COLOR_SPACE, "linear");

        let bytes = encode_with(&image, &attrs, &WriteOptions::default());
        let decoded = PngCodec.decode(&bytes, &ReadOptions::default()).unwrap();

        assert_eq!(decoded.attributes.get_str(SOFTWARE), Some("imagefile test"));
        assert_eq!(decoded.attributes.get_str(AUTHOR), Some("someone"));
        assert_eq!(decoded.attributes.get_str("Title"), Some("flat"));
        assert_eq!(decoded.attributes.get_str(COLOR_SPACE), Some("sRGB"));
    }

    #[test]
    fn test_text_chunk_filtering() {
        let mut attrs = ImageAttributes::new();
        attrs.insert(COMMENT, "ok");
        attrs.insert("bad\u{1}key", "x");
        attrs.insert("wide", "\u{4e2d}");
        let chunks = text_chunks(&attrs);
        assert_eq!(chunks, vec![("Comment".to_string(), "ok".to_string())]);
    }

    #[test]
    fn test_gray_expansion() {
        assert_eq!(gray_to_rgb(&[1u8, 2], 3), vec![1, 1, 1, 2, 2, 2]);
        assert_eq!(gray_to_rgb(&[1u16, 9], 4), vec![1, 1, 1, 9]);
    }

    #[test]
    fn test_rejects_half_output() {
        let image = Image::new(1, 1, 1, 1, 4, PixelFormat::UInt8).unwrap();
        let attrs = ImageAttributes::new();
        let entry = EncodeEntry { image: &image, attributes: &attrs };
        let options = WriteOptions::default().with_output_format(PixelFormat::Half);
        assert!(matches!(
            PngCodec.encode(&[entry], &options),
            Err(IoError::UnsupportedPixelLayout(_))
        ));
    }

    #[test]
    fn test_truncated_is_decode_error() {
        let image = Image::new(8, 8, 8, 8, 4, PixelFormat::UInt8).unwrap();
        let bytes = encode_with(&image, &ImageAttributes::new(), &WriteOptions::default());
        let err = PngCodec
            .decode(&bytes[..bytes.len() / 2], &ReadOptions::default())
            .unwrap_err();
        assert!(err.is_decode_error(), "{err}");
    }
}
