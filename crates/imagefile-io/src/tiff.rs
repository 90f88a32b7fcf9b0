//! TIFF format support.
//!
//! Writes RGBA pages at 16 bits per sample by default (8-bit and 32-bit
//! float on request), one page per image. `software`, `author` and
//! `comment` map to the `Software`, `Artist` and `ImageDescription` tags.
//!
//! Reading returns the first page at its stored depth. Gray, gray+alpha
//! and palette pages expand to RGB or RGBA.

use crate::traits::{
    CodecCapabilities, DecodedImage, EncodeEntry, ImageCodec, check_dimensions, check_layout,
    decoded_attributes, native_pixels, warn_unstored,
};
use crate::{Format, IoError, IoResult, ReadOptions, WriteOptions};
use imagefile_core::attributes::{AUTHOR, COMMENT, SOFTWARE};
use imagefile_core::{ColorEncoding, Image, PixelFormat};
use std::io::{Cursor, Seek, Write};
use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{TiffEncoder, TiffKind, colortype};
use tiff::tags::Tag;
use tracing::debug;

static CAPABILITIES: CodecCapabilities = CodecCapabilities {
    native_channels: 4,
    native_format: PixelFormat::UInt16,
    native_encoding: ColorEncoding::Linear,
    supports_alpha: true,
    multi_image: true,
    lossy: false,
    output_formats: &[PixelFormat::UInt8, PixelFormat::UInt16, PixelFormat::Float],
};

/// Attribute key to ASCII tag.
const TAGS: [(&str, Tag); 3] = [
    (SOFTWARE, Tag::Software),
    (AUTHOR, Tag::Artist),
    (COMMENT, Tag::ImageDescription),
];

fn tiff_err(e: tiff::TiffError) -> IoError {
    IoError::DecodeError(e.to_string())
}

fn tiff_encode_err(e: tiff::TiffError) -> IoError {
    IoError::EncodeError(e.to_string())
}

/// TIFF backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiffCodec;

impl ImageCodec for TiffCodec {
    fn format(&self) -> Format {
        Format::Tiff
    }

    fn capabilities(&self) -> &'static CodecCapabilities {
        &CAPABILITIES
    }

    fn encode(&self, images: &[EncodeEntry<'_>], options: &WriteOptions) -> IoResult<Vec<u8>> {
        if images.is_empty() {
            return Err(IoError::MissingData("no image to write".into()));
        }
        let format = CAPABILITIES.output_format(options.output_format)?;

        let mut out = Vec::new();
        let mut encoder = TiffEncoder::new(Cursor::new(&mut out)).map_err(tiff_encode_err)?;

        for entry in images {
            check_layout(entry.image)?;
            check_dimensions(entry.image, u32::MAX as usize, Format::Tiff)?;
            warn_unstored(entry.attributes, &[AUTHOR, COMMENT], Format::Tiff);

            match format {
                PixelFormat::UInt8 => {
                    let data: Vec<u8> = native_pixels(entry, 4, &CAPABILITIES, options);
                    write_page::<colortype::RGBA8, _, _>(&mut encoder, entry, &data)?;
                }
                PixelFormat::Float => {
                    let data: Vec<f32> = native_pixels(entry, 4, &CAPABILITIES, options);
                    write_page::<colortype::RGBA32Float, _, _>(&mut encoder, entry, &data)?;
                }
                _ => {
                    let data: Vec<u16> = native_pixels(entry, 4, &CAPABILITIES, options);
                    write_page::<colortype::RGBA16, _, _>(&mut encoder, entry, &data)?;
                }
            }
        }
        drop(encoder);

        debug!(pages = images.len(), %format, bytes = out.len(), "encoded TIFF");
        Ok(out)
    }

    fn decode(&self, data: &[u8], options: &ReadOptions) -> IoResult<DecodedImage> {
        let mut decoder = Decoder::new(Cursor::new(data)).map_err(tiff_err)?;

        let (width, height) = decoder.dimensions().map_err(tiff_err)?;
        let (width, height) = (width as usize, height as usize);
        let color_type = decoder.colortype().map_err(tiff_err)?;

        let mut attributes = decoded_attributes(ColorEncoding::Linear);
        for (key, tag) in TAGS {
            if let Ok(value) = decoder.get_tag_ascii_string(tag) {
                let value = value.trim_end_matches('\0');
                if !value.is_empty() {
                    attributes.insert(key, value);
                }
            }
        }

        let palette = match color_type {
            ColorType::Palette(_) => Some(
                decoder
                    .get_tag_u16_vec(Tag::ColorMap)
                    .map_err(tiff_err)?,
            ),
            _ => None,
        };

        let result = decoder.read_image().map_err(tiff_err)?;
        let (tw, th) = (options.tile_width, options.tile_height);

        let image = match (color_type, result) {
            (ColorType::RGB(8), DecodingResult::U8(buf)) => {
                Image::from_interleaved(width, height, tw, th, 3, &buf)?
            }
            (ColorType::RGBA(8), DecodingResult::U8(buf)) => {
                Image::from_interleaved(width, height, tw, th, 4, &buf)?
            }
            (ColorType::RGB(16), DecodingResult::U16(buf)) => {
                Image::from_interleaved(width, height, tw, th, 3, &buf)?
            }
            (ColorType::RGBA(16), DecodingResult::U16(buf)) => {
                Image::from_interleaved(width, height, tw, th, 4, &buf)?
            }
            (ColorType::RGB(32), DecodingResult::F32(buf)) => {
                Image::from_interleaved(width, height, tw, th, 3, &buf)?
            }
            (ColorType::RGBA(32), DecodingResult::F32(buf)) => {
                Image::from_interleaved(width, height, tw, th, 4, &buf)?
            }
            (ColorType::RGB(32), DecodingResult::U32(buf)) => {
                Image::from_interleaved(width, height, tw, th, 3, &buf)?
            }
            (ColorType::RGBA(32), DecodingResult::U32(buf)) => {
                Image::from_interleaved(width, height, tw, th, 4, &buf)?
            }
            (ColorType::Gray(8), DecodingResult::U8(buf)) => {
                Image::from_interleaved(width, height, tw, th, 3, &expand_gray(&buf, false))?
            }
            (ColorType::Gray(16), DecodingResult::U16(buf)) => {
                Image::from_interleaved(width, height, tw, th, 3, &expand_gray(&buf, false))?
            }
            (ColorType::Gray(32), DecodingResult::F32(buf)) => {
                Image::from_interleaved(width, height, tw, th, 3, &expand_gray(&buf, false))?
            }
            (ColorType::GrayA(8), DecodingResult::U8(buf)) => {
                Image::from_interleaved(width, height, tw, th, 4, &expand_gray(&buf, true))?
            }
            (ColorType::GrayA(16), DecodingResult::U16(buf)) => {
                Image::from_interleaved(width, height, tw, th, 4, &expand_gray(&buf, true))?
            }
            (ColorType::Palette(8), DecodingResult::U8(buf)) => {
                let colormap = palette.unwrap_or_default();
                let rgb = expand_palette(&buf, &colormap, 8)?;
                Image::from_interleaved(width, height, tw, th, 3, &rgb)?
            }
            (ct, _) => {
                return Err(IoError::UnsupportedPixelLayout(format!(
                    "unsupported TIFF color type: {ct:?}"
                )));
            }
        };

        Ok(DecodedImage { image, attributes })
    }
}

fn write_page<C, W, K>(
    encoder: &mut TiffEncoder<W, K>,
    entry: &EncodeEntry<'_>,
    data: &[C::Inner],
) -> IoResult<()>
where
    C: colortype::ColorType,
    [C::Inner]: tiff::encoder::TiffValue,
    W: Write + Seek,
    K: TiffKind,
{
    let (width, height) = entry.image.dimensions();
    let mut page = encoder
        .new_image::<C>(width as u32, height as u32)
        .map_err(tiff_encode_err)?;

    for (key, tag) in TAGS {
        if let Some(value) = entry.attributes.get(key) {
            page.encoder()
                .write_tag(tag, value.to_string().as_str())
                .map_err(tiff_encode_err)?;
        }
    }

    page.write_data(data).map_err(tiff_encode_err)
}

/// Gray or gray+alpha samples to RGB or RGBA.
fn expand_gray<T: Copy>(samples: &[T], alpha: bool) -> Vec<T> {
    if alpha {
        samples
            .chunks_exact(2)
            .flat_map(|ga| [ga[0], ga[0], ga[0], ga[1]])
            .collect()
    } else {
        samples.iter().flat_map(|&g| [g, g, g]).collect()
    }
}

/// Palette indices to 16-bit RGB. TIFF color maps hold all red entries,
/// then all green, then all blue.
fn expand_palette(indices: &[u8], colormap: &[u16], bits: u32) -> IoResult<Vec<u16>> {
    let entries = 1usize << bits;
    if colormap.len() < entries * 3 {
        return Err(IoError::DecodeError(format!(
            "TIFF color map has {} values, expected {}",
            colormap.len(),
            entries * 3
        )));
    }
    let (r, rest) = colormap.split_at(entries);
    let (g, b) = rest.split_at(entries);

    Ok(indices
        .iter()
        .flat_map(|&i| {
            let i = i as usize;
            [r[i], g[i], b[i]]
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagefile_core::{Color3b, Color4b, Color4f, ImageAttributes};

    fn encode_all(images: &[&Image], attrs: &ImageAttributes, options: &WriteOptions) -> Vec<u8> {
        let entries: Vec<EncodeEntry<'_>> = images
            .iter()
            .map(|&image| EncodeEntry { image, attributes: attrs })
            .collect();
        TiffCodec.encode(&entries, options).unwrap()
    }

    #[test]
    fn test_roundtrip_default_depth() {
        let mut image = Image::new(16, 16, 16, 16, 4, PixelFormat::UInt8).unwrap();
        image.clear(Color4b::new(50, 100, 150, 42));
        let bytes = encode_all(&[&image], &ImageAttributes::new(), &WriteOptions::default());
        assert!(bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*"));

        let decoded = TiffCodec.decode(&bytes, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.image.pixel_format(), PixelFormat::UInt16);
        assert_eq!(decoded.image.channel_count(), 4);
        assert_eq!(decoded.image.get_pixel::<u8, 4>(15, 15), Color4b::new(50, 100, 150, 42));
        assert_eq!(decoded.attributes.get_str("color_space"), Some("linear"));
    }

    #[test]
    fn test_output_formats() {
        let mut image = Image::new(3, 2, 2, 2, 3, PixelFormat::Float).unwrap();
        image.clear(Color4f::new(0.25, 0.5, 2.0, 1.0).rgb());

        let options = WriteOptions::default().with_output_format(PixelFormat::Float);
        let bytes = encode_all(&[&image], &ImageAttributes::new(), &options);
        let decoded = TiffCodec.decode(&bytes, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.image.pixel_format(), PixelFormat::Float);
        assert_eq!(decoded.image.get_pixel::<f32, 4>(2, 1), Color4f::new(0.25, 0.5, 2.0, 1.0));

        let options = WriteOptions::default().with_output_format(PixelFormat::UInt8);
        let bytes = encode_all(&[&image], &ImageAttributes::new(), &options);
        let decoded = TiffCodec.decode(&bytes, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.image.pixel_format(), PixelFormat::UInt8);
        assert_eq!(decoded.image.get_pixel::<u8, 4>(0, 0), Color4b::new(64, 128, 255, 255));
    }

    #[test]
    fn test_multi_page_reads_first() {
        let mut first = Image::new(4, 4, 4, 4, 3, PixelFormat::UInt8).unwrap();
        first.clear(Color3b::new(10, 20, 30));
        let mut second = Image::new(2, 2, 2, 2, 3, PixelFormat::UInt8).unwrap();
        second.clear(Color3b::new(40, 50, 60));

        let bytes = encode_all(&[&first, &second], &ImageAttributes::new(), &WriteOptions::default());
        let decoded = TiffCodec.decode(&bytes, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.image.dimensions(), (4, 4));
        assert_eq!(decoded.image.get_pixel::<u8, 3>(1, 1), Color3b::new(10, 20, 30));

        let mut decoder = Decoder::new(Cursor::new(&bytes)).unwrap();
        assert!(decoder.more_images());
        decoder.next_image().unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (2, 2));
    }

    #[test]
    fn test_tags_roundtrip() {
        let image = Image::new(1, 1, 1, 1, 4, PixelFormat::UInt16).unwrap();
        let mut attrs = ImageAttributes::new();
        attrs.insert(SOFTWARE, "imagefile");
        attrs.insert(AUTHOR, "artist name");
        attrs.insert(COMMENT, "a description");

        let bytes = encode_all(&[&image], &attrs, &WriteOptions::default());
        let decoded = TiffCodec.decode(&bytes, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.attributes.get_str(SOFTWARE), Some("imagefile"));
        assert_eq!(decoded.attributes.get_str(AUTHOR), Some("artist name"));
        assert_eq!(decoded.attributes.get_str(COMMENT), Some("a description"));
    }

    #[test]
    fn test_expand_helpers() {
        assert_eq!(expand_gray(&[3u8, 4], false), vec![3, 3, 3, 4, 4, 4]);
        assert_eq!(expand_gray(&[3u16, 9], true), vec![3, 3, 3, 9]);

        let mut colormap = vec![0u16; 256 * 3];
        colormap[1] = 100;
        colormap[256 + 1] = 200;
        colormap[512 + 1] = 300;
        assert_eq!(expand_palette(&[1, 0], &colormap, 8).unwrap(), vec![100, 200, 300, 0, 0, 0]);
        assert!(expand_palette(&[0], &colormap[..10], 8).is_err());
    }

    #[test]
    fn test_corrupt_is_decode_error() {
        let err = TiffCodec
            .decode(b"II*\0\xff\xff\xff\x7f", &ReadOptions::default())
            .unwrap_err();
        assert!(err.is_decode_error(), "{err}");
    }

    #[test]
    fn test_empty_is_missing_data() {
        let err = TiffCodec.encode(&[], &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, IoError::MissingData(_)));
    }
}
