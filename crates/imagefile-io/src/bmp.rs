//! Windows bitmap support.
//!
//! Writes 32-bit BGRA files with a `BITMAPV4HEADER`, explicit channel masks
//! and the sRGB color space tag, so alpha survives in every common reader.
//!
//! Reads uncompressed 24-bit and 32-bit files (`BI_RGB` or `BI_BITFIELDS`)
//! plus 1/4/8-bit palette files, which expand to RGB.

use crate::traits::{
    CodecCapabilities, DecodedImage, EncodeEntry, ImageCodec, check_dimensions, check_layout,
    decoded_attributes, native_pixels, single_image, truncated, warn_unstored,
};
use crate::{Format, IoError, IoResult, ReadOptions, WriteOptions};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use imagefile_core::{ColorEncoding, Image, PixelFormat};
use std::io::{Cursor, Read, Write};
use tracing::debug;

const FILE_HEADER_SIZE: u32 = 14;
const INFO_HEADER_SIZE: u32 = 40;
const V4_HEADER_SIZE: u32 = 108;

const BI_RGB: u32 = 0;
const BI_BITFIELDS: u32 = 3;

/// `'sRGB'` as stored in `bV4CSType`.
const LCS_SRGB: u32 = 0x7352_4742;
/// 72 DPI.
const PIXELS_PER_METER: i32 = 2835;

const MASK_R: u32 = 0x00FF_0000;
const MASK_G: u32 = 0x0000_FF00;
const MASK_B: u32 = 0x0000_00FF;
const MASK_A: u32 = 0xFF00_0000;

static CAPABILITIES: CodecCapabilities = CodecCapabilities {
    native_channels: 4,
    native_format: PixelFormat::UInt8,
    native_encoding: ColorEncoding::Srgb,
    supports_alpha: true,
    multi_image: false,
    lossy: false,
    output_formats: &[PixelFormat::UInt8],
};

/// BMP backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct BmpCodec;

impl ImageCodec for BmpCodec {
    fn format(&self) -> Format {
        Format::Bmp
    }

    fn capabilities(&self) -> &'static CodecCapabilities {
        &CAPABILITIES
    }

    fn encode(&self, images: &[EncodeEntry<'_>], options: &WriteOptions) -> IoResult<Vec<u8>> {
        let entry = single_image(images, Format::Bmp)?;
        check_layout(entry.image)?;
        check_dimensions(entry.image, i32::MAX as usize / 4, Format::Bmp)?;
        CAPABILITIES.output_format(options.output_format)?;
        warn_unstored(entry.attributes, &[], Format::Bmp);

        let (width, height) = entry.image.dimensions();
        let pixels: Vec<u8> = native_pixels(entry, 4, &CAPABILITIES, options);

        let too_large = || IoError::UnsupportedPixelLayout(format!("{width}x{height} is too large for BMP"));
        let image_size = u32::try_from(width * height * 4).map_err(|_| too_large())?;
        let offset = FILE_HEADER_SIZE + V4_HEADER_SIZE;
        let file_size = offset.checked_add(image_size).ok_or_else(too_large)?;

        let mut out = Vec::with_capacity(file_size as usize);

        // BITMAPFILEHEADER
        out.write_all(b"BM")?;
        out.write_u32::<LittleEndian>(file_size)?;
        out.write_u32::<LittleEndian>(0)?;
        out.write_u32::<LittleEndian>(offset)?;

        // BITMAPV4HEADER
        out.write_u32::<LittleEndian>(V4_HEADER_SIZE)?;
        out.write_i32::<LittleEndian>(width as i32)?;
        out.write_i32::<LittleEndian>(height as i32)?;
        out.write_u16::<LittleEndian>(1)?;
        out.write_u16::<LittleEndian>(32)?;
        out.write_u32::<LittleEndian>(BI_BITFIELDS)?;
        out.write_u32::<LittleEndian>(image_size)?;
        out.write_i32::<LittleEndian>(PIXELS_PER_METER)?;
        out.write_i32::<LittleEndian>(PIXELS_PER_METER)?;
        out.write_u32::<LittleEndian>(0)?;
        out.write_u32::<LittleEndian>(0)?;
        for mask in [MASK_R, MASK_G, MASK_B, MASK_A] {
            out.write_u32::<LittleEndian>(mask)?;
        }
        out.write_u32::<LittleEndian>(LCS_SRGB)?;
        // CIEXYZTRIPLE endpoints and RGB gamma, unused with LCS_sRGB
        out.write_all(&[0u8; 36 + 12])?;

        // Bottom-up BGRA rows; 32-bit rows need no padding.
        for row in pixels.chunks_exact(width * 4).rev() {
            for px in row.chunks_exact(4) {
                out.write_all(&[px[2], px[1], px[0], px[3]])?;
            }
        }

        debug!(width, height, bytes = out.len(), "encoded BMP");
        Ok(out)
    }

    fn decode(&self, data: &[u8], options: &ReadOptions) -> IoResult<DecodedImage> {
        let bmp = parse(data).map_err(truncated(Format::Bmp))?;
        let image = Image::from_interleaved(
            bmp.width,
            bmp.height,
            options.tile_width,
            options.tile_height,
            bmp.channels,
            &bmp.pixels,
        )?;
        Ok(DecodedImage {
            image,
            attributes: decoded_attributes(ColorEncoding::Srgb),
        })
    }
}

/// Decoded bitmap: top-down, interleaved RGB or RGBA.
struct Bitmap {
    width: usize,
    height: usize,
    channels: usize,
    pixels: Vec<u8>,
}

/// Extracts one channel through a bit mask.
#[derive(Debug, Clone, Copy)]
struct ChannelMask {
    mask: u32,
    shift: u32,
    max: u32,
}

impl ChannelMask {
    fn new(mask: u32) -> Self {
        if mask == 0 {
            return Self { mask: 0, shift: 0, max: 0 };
        }
        let shift = mask.trailing_zeros();
        Self {
            mask,
            shift,
            max: mask >> shift,
        }
    }

    fn extract(&self, value: u32) -> u8 {
        if self.max == 0 {
            return 0;
        }
        let v = (value & self.mask) >> self.shift;
        ((u64::from(v) * 255 + u64::from(self.max) / 2) / u64::from(self.max)) as u8
    }
}

fn parse(data: &[u8]) -> IoResult<Bitmap> {
    let mut reader = Cursor::new(data);

    let mut magic = [0u8; 2];
    reader.read_exact(&mut magic)?;
    if &magic != b"BM" {
        return Err(IoError::DecodeError("not a BMP file".into()));
    }
    let _file_size = reader.read_u32::<LittleEndian>()?;
    let _reserved = reader.read_u32::<LittleEndian>()?;
    let pixel_offset = reader.read_u32::<LittleEndian>()? as usize;

    let header_size = reader.read_u32::<LittleEndian>()?;
    if header_size < INFO_HEADER_SIZE {
        return Err(IoError::DecodeError(format!(
            "unsupported BMP header size: {header_size}"
        )));
    }
    let width = reader.read_i32::<LittleEndian>()?;
    let height = reader.read_i32::<LittleEndian>()?;
    let planes = reader.read_u16::<LittleEndian>()?;
    let bpp = reader.read_u16::<LittleEndian>()?;
    let compression = reader.read_u32::<LittleEndian>()?;
    let _image_size = reader.read_u32::<LittleEndian>()?;
    let _xppm = reader.read_i32::<LittleEndian>()?;
    let _yppm = reader.read_i32::<LittleEndian>()?;
    let colors_used = reader.read_u32::<LittleEndian>()?;
    let _colors_important = reader.read_u32::<LittleEndian>()?;

    if planes != 1 {
        return Err(IoError::DecodeError(format!("invalid BMP plane count: {planes}")));
    }
    if width <= 0 || height == 0 {
        return Err(IoError::DecodeError(format!("invalid BMP size {width}x{height}")));
    }

    // Masks sit inside V2+ headers, or directly after a 40-byte header.
    let masks = if compression == BI_BITFIELDS {
        let r = reader.read_u32::<LittleEndian>()?;
        let g = reader.read_u32::<LittleEndian>()?;
        let b = reader.read_u32::<LittleEndian>()?;
        let a = if header_size >= 56 {
            reader.read_u32::<LittleEndian>()?
        } else {
            0
        };
        Some([r, g, b, a])
    } else if compression == BI_RGB {
        None
    } else {
        return Err(IoError::UnsupportedPixelLayout(format!(
            "BMP compression {compression} is not supported"
        )));
    };

    let top_down = height < 0;
    let width = width as usize;
    let height = height.unsigned_abs() as usize;

    let palette_at = (FILE_HEADER_SIZE + header_size) as usize
        + if compression == BI_BITFIELDS && header_size == INFO_HEADER_SIZE {
            12
        } else {
            0
        };

    let channels = match (bpp, masks) {
        (32, Some([.., a])) if a != 0 => 4,
        (32, None) => 4,
        (24 | 32, _) => 3,
        (1 | 4 | 8, None) => 3,
        _ => {
            return Err(IoError::UnsupportedPixelLayout(format!(
                "{bpp}-bit BMP is not supported"
            )));
        }
    };

    let palette = if bpp <= 8 {
        let count = match colors_used {
            0 => 1usize << bpp,
            n => (n as usize).min(1 << bpp),
        };
        let bytes = data
            .get(palette_at..palette_at + count * 4)
            .ok_or_else(|| IoError::DecodeError("BMP palette truncated".into()))?;
        bytes.chunks_exact(4).map(|c| [c[2], c[1], c[0]]).collect()
    } else {
        Vec::new()
    };

    let stride = (width * bpp as usize).div_ceil(32) * 4;
    let needed = stride
        .checked_mul(height)
        .and_then(|n| n.checked_add(pixel_offset))
        .ok_or_else(|| IoError::DecodeError("BMP size overflows".into()))?;
    let body = data
        .get(pixel_offset..needed)
        .ok_or_else(|| IoError::DecodeError("BMP pixel data truncated".into()))?;

    let unpack = masks.map(|[r, g, b, a]| {
        [
            ChannelMask::new(r),
            ChannelMask::new(g),
            ChannelMask::new(b),
            ChannelMask::new(a),
        ]
    });

    let mut pixels = vec![0u8; width * height * channels];
    for (row_index, row) in body.chunks_exact(stride).enumerate() {
        let y = if top_down { row_index } else { height - 1 - row_index };
        let out = &mut pixels[y * width * channels..(y + 1) * width * channels];

        for (x, px) in out.chunks_exact_mut(channels).enumerate() {
            match bpp {
                32 => {
                    let s = &row[x * 4..x * 4 + 4];
                    match &unpack {
                        Some(masks) => {
                            let v = u32::from_le_bytes([s[0], s[1], s[2], s[3]]);
                            for (c, dst) in px.iter_mut().enumerate() {
                                *dst = masks[c].extract(v);
                            }
                        }
                        None => px.copy_from_slice(&[s[2], s[1], s[0], s[3]]),
                    }
                }
                24 => {
                    let s = &row[x * 3..x * 3 + 3];
                    px.copy_from_slice(&[s[2], s[1], s[0]]);
                }
                _ => {
                    let index = palette_index(row, x, bpp);
                    let rgb = palette.get(index).copied().unwrap_or([0, 0, 0]);
                    px.copy_from_slice(&rgb);
                }
            }
        }
    }

    // Plain 32-bit files usually leave the fourth byte zeroed.
    if bpp == 32 && masks.is_none() && pixels.chunks_exact(4).all(|px| px[3] == 0) {
        for px in pixels.chunks_exact_mut(4) {
            px[3] = 255;
        }
    }

    Ok(Bitmap {
        width,
        height,
        channels,
        pixels,
    })
}

fn palette_index(row: &[u8], x: usize, bpp: u16) -> usize {
    match bpp {
        1 => ((row[x / 8] >> (7 - x % 8)) & 1) as usize,
        4 => {
            let byte = row[x / 2];
            (if x % 2 == 0 { byte >> 4 } else { byte & 0xF }) as usize
        }
        _ => row[x] as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagefile_core::{Color3b, Color4b, ImageAttributes};

    fn encode(image: &Image) -> Vec<u8> {
        let attrs = ImageAttributes::new();
        let entry = EncodeEntry { image, attributes: &attrs };
        BmpCodec.encode(&[entry], &WriteOptions::default()).unwrap()
    }

    /// Builds a 40-byte-header file around raw rows.
    fn legacy_bmp(width: i32, height: i32, bpp: u16, palette: &[[u8; 4]], rows: &[u8]) -> Vec<u8> {
        let offset = 14 + 40 + palette.len() as u32 * 4;
        let mut out = Vec::new();
        out.write_all(b"BM").unwrap();
        out.write_u32::<LittleEndian>(offset + rows.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(offset).unwrap();
        out.write_u32::<LittleEndian>(40).unwrap();
        out.write_i32::<LittleEndian>(width).unwrap();
        out.write_i32::<LittleEndian>(height).unwrap();
        out.write_u16::<LittleEndian>(1).unwrap();
        out.write_u16::<LittleEndian>(bpp).unwrap();
        out.write_u32::<LittleEndian>(BI_RGB).unwrap();
        for _ in 0..5 {
            out.write_u32::<LittleEndian>(0).unwrap();
        }
        for entry in palette {
            out.write_all(entry).unwrap();
        }
        out.write_all(rows).unwrap();
        out
    }

    #[test]
    fn test_header_layout() {
        let image = Image::new(3, 2, 3, 2, 4, PixelFormat::UInt8).unwrap();
        let bytes = encode(&image);

        assert_eq!(&bytes[0..2], b"BM");
        assert_eq!(bytes.len(), 122 + 3 * 2 * 4);
        assert_eq!(u32::from_le_bytes(bytes[2..6].try_into().unwrap()), bytes.len() as u32);
        assert_eq!(u32::from_le_bytes(bytes[10..14].try_into().unwrap()), 122);
        assert_eq!(u32::from_le_bytes(bytes[14..18].try_into().unwrap()), 108);
        assert_eq!(u16::from_le_bytes(bytes[28..30].try_into().unwrap()), 32);
        assert_eq!(u32::from_le_bytes(bytes[30..34].try_into().unwrap()), BI_BITFIELDS);
        assert_eq!(u32::from_le_bytes(bytes[66..70].try_into().unwrap()), MASK_A);
        assert_eq!(u32::from_le_bytes(bytes[70..74].try_into().unwrap()), LCS_SRGB);
    }

    #[test]
    fn test_roundtrip_rgba() {
        let mut image = Image::new(3, 2, 2, 2, 4, PixelFormat::UInt8).unwrap();
        image.clear(Color4b::new(50, 100, 150, 42));
        image.set_pixel(2, 0, Color4b::new(1, 2, 3, 4));

        let decoded = BmpCodec.decode(&encode(&image), &ReadOptions::default()).unwrap();
        assert_eq!(decoded.image.channel_count(), 4);
        assert_eq!(decoded.image.pixel_format(), PixelFormat::UInt8);
        assert_eq!(decoded.image.get_pixel::<u8, 4>(0, 1), Color4b::new(50, 100, 150, 42));
        assert_eq!(decoded.image.get_pixel::<u8, 4>(2, 0), Color4b::new(1, 2, 3, 4));
        assert_eq!(decoded.attributes.get_str("color_space"), Some("sRGB"));
    }

    #[test]
    fn test_rgb_source_written_opaque() {
        let mut image = Image::new(2, 2, 2, 2, 3, PixelFormat::UInt16).unwrap();
        image.clear(Color3b::new(50, 100, 150));

        let decoded = BmpCodec.decode(&encode(&image), &ReadOptions::default()).unwrap();
        assert_eq!(decoded.image.get_pixel::<u8, 4>(1, 1), Color4b::new(50, 100, 150, 255));
    }

    #[test]
    fn test_read_24bit_bottom_up() {
        // 2x2: bottom row red/green, top row blue/white, rows padded to 8 bytes
        let rows = [
            0, 0, 255, 0, 255, 0, 0, 0, //
            255, 0, 0, 255, 255, 255, 0, 0,
        ];
        let data = legacy_bmp(2, 2, 24, &[], &rows);
        let decoded = BmpCodec.decode(&data, &ReadOptions::default()).unwrap();

        assert_eq!(decoded.image.channel_count(), 3);
        assert_eq!(decoded.image.get_pixel::<u8, 3>(0, 1), Color3b::new(255, 0, 0));
        assert_eq!(decoded.image.get_pixel::<u8, 3>(1, 1), Color3b::new(0, 255, 0));
        assert_eq!(decoded.image.get_pixel::<u8, 3>(0, 0), Color3b::new(0, 0, 255));
        assert_eq!(decoded.image.get_pixel::<u8, 3>(1, 0), Color3b::new(255, 255, 255));
    }

    #[test]
    fn test_read_32bit_zero_alpha_is_opaque() {
        let rows = [10, 20, 30, 0];
        let data = legacy_bmp(1, -1, 32, &[], &rows);
        let decoded = BmpCodec.decode(&data, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.image.get_pixel::<u8, 4>(0, 0), Color4b::new(30, 20, 10, 255));
    }

    #[test]
    fn test_read_palette() {
        let palette = [[0, 0, 0, 0], [0, 0, 255, 0]];
        // 1-bit, 3 pixels: 1 0 1
        let rows = [0b1010_0000, 0, 0, 0];
        let data = legacy_bmp(3, 1, 1, &palette, &rows);
        let decoded = BmpCodec.decode(&data, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.image.get_pixel::<u8, 3>(0, 0), Color3b::new(255, 0, 0));
        assert_eq!(decoded.image.get_pixel::<u8, 3>(1, 0), Color3b::new(0, 0, 0));
        assert_eq!(decoded.image.get_pixel::<u8, 3>(2, 0), Color3b::new(255, 0, 0));
    }

    #[test]
    fn test_channel_mask() {
        let m = ChannelMask::new(0x7C00);
        assert_eq!(m.extract(0x7C00), 255);
        assert_eq!(m.extract(0), 0);
        assert_eq!(ChannelMask::new(0).extract(0xFFFF_FFFF), 0);
    }

    #[test]
    fn test_truncated_is_decode_error() {
        let mut image = Image::new(4, 4, 4, 4, 4, PixelFormat::UInt8).unwrap();
        image.clear(Color4b::new(1, 2, 3, 4));
        let bytes = encode(&image);

        for len in [1, 10, 40, bytes.len() - 1] {
            let err = BmpCodec.decode(&bytes[..len], &ReadOptions::default()).unwrap_err();
            assert!(err.is_decode_error(), "{len}: {err}");
        }
    }

    #[test]
    fn test_rejects_two_channels() {
        let image = Image::new(1, 1, 1, 1, 2, PixelFormat::UInt8).unwrap();
        let attrs = ImageAttributes::new();
        let entry = EncodeEntry { image: &image, attributes: &attrs };
        let err = BmpCodec.encode(&[entry], &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, IoError::UnsupportedPixelLayout(_)));
    }
}
