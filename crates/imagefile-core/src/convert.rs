//! Channel conversion matrix between pixel formats.
//!
//! Every conversion goes through a [`Sample`]: a decoded channel value that
//! remembers whether it came from an integer format (and its range) or a
//! float format. Writing a sample into a destination format picks the rule
//! for the (source, destination) pair:
//!
//! | Source  | Destination | Rule                                         |
//! |---------|-------------|----------------------------------------------|
//! | integer | integer     | exact rescale `v * dmax / smax`, rounded      |
//! | integer | float       | `v / smax`                                   |
//! | float   | integer     | clamp to `[0, 1]`, `* dmax`, round to nearest |
//! | float   | float       | cast (half via `half::f16`)                  |
//!
//! Channel counts are reconciled by index: surplus source channels are
//! dropped, a missing alpha channel (index 3) becomes fully opaque and any
//! other missing channel becomes zero.
//!
//! # Example
//!
//! ```rust
//! use imagefile_core::convert::convert_sample;
//! use imagefile_core::PixelFormat;
//!
//! let src = [50u8];
//! let mut dst = [0u8; 2];
//! convert_sample(PixelFormat::UInt8, &src, PixelFormat::UInt16, &mut dst);
//! assert_eq!(u16::from_ne_bytes(dst), 50 * 257);
//! ```

use crate::PixelFormat;
use half::f16;

/// Index of the alpha channel in a 4-channel pixel.
pub const ALPHA_CHANNEL: usize = 3;

/// One decoded channel value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// Integer value normalized over `0..=max`.
    Int {
        /// Stored value.
        value: u32,
        /// Value that represents 1.0.
        max: u32,
    },
    /// Float value, 1.0 is full intensity.
    Float(f32),
}

impl Sample {
    /// Zero intensity.
    pub const ZERO: Sample = Sample::Float(0.0);

    /// Full intensity (opaque alpha).
    pub const ONE: Sample = Sample::Float(1.0);

    /// Returns this sample as an integer over `0..=max`.
    #[inline]
    pub fn to_int(self, max: u32) -> u32 {
        match self {
            Sample::Int { value, max: src_max } if src_max == max => value,
            Sample::Int { value, max: src_max } => {
                let src_max = u64::from(src_max);
                ((u64::from(value) * u64::from(max) + src_max / 2) / src_max) as u32
            }
            Sample::Float(v) => {
                let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
                if max > u32::from(u16::MAX) {
                    (f64::from(v) * f64::from(max)).round() as u32
                } else {
                    (v * max as f32).round() as u32
                }
            }
        }
    }

    /// Returns this sample as a float, integers normalized to `[0, 1]`.
    #[inline]
    pub fn to_float(self) -> f32 {
        match self {
            Sample::Int { value, max } if max > u32::from(u16::MAX) => {
                (f64::from(value) / f64::from(max)) as f32
            }
            Sample::Int { value, max } => value as f32 / max as f32,
            Sample::Float(v) => v,
        }
    }
}

/// Decodes one channel stored in `format` at the start of `bytes`.
///
/// # Panics
///
/// Panics if `bytes` is shorter than `format.size()`.
#[inline]
pub fn read_sample(format: PixelFormat, bytes: &[u8]) -> Sample {
    match format {
        PixelFormat::UInt8 => Sample::Int {
            value: u32::from(bytes[0]),
            max: u32::from(u8::MAX),
        },
        PixelFormat::UInt16 => Sample::Int {
            value: u32::from(u16::from_ne_bytes([bytes[0], bytes[1]])),
            max: u32::from(u16::MAX),
        },
        PixelFormat::UInt32 => Sample::Int {
            value: u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            max: u32::MAX,
        },
        PixelFormat::Half => Sample::Float(f16::from_ne_bytes([bytes[0], bytes[1]]).to_f32()),
        PixelFormat::Float => {
            Sample::Float(f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
    }
}

/// Encodes `sample` into `format` at the start of `bytes`.
///
/// # Panics
///
/// Panics if `bytes` is shorter than `format.size()`.
#[inline]
pub fn write_sample(format: PixelFormat, sample: Sample, bytes: &mut [u8]) {
    match format {
        PixelFormat::UInt8 => bytes[0] = sample.to_int(u32::from(u8::MAX)) as u8,
        PixelFormat::UInt16 => {
            let v = sample.to_int(u32::from(u16::MAX)) as u16;
            bytes[..2].copy_from_slice(&v.to_ne_bytes());
        }
        PixelFormat::UInt32 => {
            bytes[..4].copy_from_slice(&sample.to_int(u32::MAX).to_ne_bytes());
        }
        PixelFormat::Half => {
            bytes[..2].copy_from_slice(&f16::from_f32(sample.to_float()).to_ne_bytes());
        }
        PixelFormat::Float => {
            bytes[..4].copy_from_slice(&sample.to_float().to_ne_bytes());
        }
    }
}

/// Converts one channel from `src` format to `dst` format.
#[inline]
pub fn convert_sample(src: PixelFormat, src_bytes: &[u8], dst: PixelFormat, dst_bytes: &mut [u8]) {
    if src == dst {
        let size = src.size();
        dst_bytes[..size].copy_from_slice(&src_bytes[..size]);
    } else {
        write_sample(dst, read_sample(src, src_bytes), dst_bytes);
    }
}

/// Converts one pixel between formats and channel counts.
///
/// `src` holds `src_channels` channels of `src_format`; `dst` receives
/// `dst_channels` channels of `dst_format`.
pub fn convert_pixel(
    src_format: PixelFormat,
    src_channels: usize,
    src: &[u8],
    dst_format: PixelFormat,
    dst_channels: usize,
    dst: &mut [u8],
) {
    let src_size = src_format.size();
    let dst_size = dst_format.size();

    for c in 0..dst_channels {
        let out = &mut dst[c * dst_size..(c + 1) * dst_size];
        if c < src_channels {
            convert_sample(src_format, &src[c * src_size..], dst_format, out);
        } else {
            write_sample(dst_format, missing_channel(c), out);
        }
    }
}

/// Value synthesized for destination channel `c` when the source lacks it.
#[inline]
pub fn missing_channel(c: usize) -> Sample {
    if c == ALPHA_CHANNEL {
        Sample::ONE
    } else {
        Sample::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert_one(src: PixelFormat, bytes: &[u8], dst: PixelFormat) -> Sample {
        let mut out = [0u8; 4];
        convert_sample(src, bytes, dst, &mut out);
        read_sample(dst, &out)
    }

    #[test]
    fn test_u8_to_u16_is_exact() {
        for v in [0u8, 1, 42, 50, 100, 150, 255] {
            let s = convert_one(PixelFormat::UInt8, &[v], PixelFormat::UInt16);
            assert_eq!(s.to_int(65535), u32::from(v) * 257);
        }
    }

    #[test]
    fn test_u16_to_u8_rounds() {
        let bytes = 12850u16.to_ne_bytes();
        assert_eq!(convert_one(PixelFormat::UInt16, &bytes, PixelFormat::UInt8).to_int(255), 50);

        let bytes = 65535u16.to_ne_bytes();
        assert_eq!(convert_one(PixelFormat::UInt16, &bytes, PixelFormat::UInt8).to_int(255), 255);

        // 128.5 units of 8-bit rounds up
        let bytes = 33024u16.to_ne_bytes();
        assert_eq!(convert_one(PixelFormat::UInt16, &bytes, PixelFormat::UInt8).to_int(255), 129);
    }

    #[test]
    fn test_float_to_u8() {
        assert_eq!(Sample::Float(0.6).to_int(255), 153);
        assert_eq!(Sample::Float(0.7).to_int(255), 179);
        assert_eq!(Sample::Float(0.8).to_int(255), 204);
        assert_eq!(Sample::Float(-1.0).to_int(255), 0);
        assert_eq!(Sample::Float(7.5).to_int(255), 255);
        assert_eq!(Sample::Float(f32::NAN).to_int(255), 0);
    }

    #[test]
    fn test_u32_range() {
        let bytes = u32::MAX.to_ne_bytes();
        let s = convert_one(PixelFormat::UInt32, &bytes, PixelFormat::Float);
        assert_eq!(s.to_float(), 1.0);
        assert_eq!(Sample::Float(1.0).to_int(u32::MAX), u32::MAX);

        let s = convert_one(PixelFormat::UInt8, &[255], PixelFormat::UInt32);
        assert_eq!(s.to_int(u32::MAX), u32::MAX);
    }

    #[test]
    fn test_half_roundtrip_through_u8() {
        for v in [0u8, 42, 50, 100, 150, 255] {
            let s = convert_one(PixelFormat::UInt8, &[v], PixelFormat::Half);
            let mut h = [0u8; 2];
            write_sample(PixelFormat::Half, s, &mut h);
            let back = convert_one(PixelFormat::Half, &h, PixelFormat::UInt8);
            assert_eq!(back.to_int(255), u32::from(v));
        }
    }

    #[test]
    fn test_same_format_copies_bits() {
        let bytes = 0.123_456_f32.to_ne_bytes();
        let mut out = [0u8; 4];
        convert_sample(PixelFormat::Float, &bytes, PixelFormat::Float, &mut out);
        assert_eq!(out, bytes);
    }

    #[test]
    fn test_pixel_rgb_to_rgba_pads_opaque() {
        let src = [10u8, 20, 30];
        let mut dst = [0u8; 4];
        convert_pixel(PixelFormat::UInt8, 3, &src, PixelFormat::UInt8, 4, &mut dst);
        assert_eq!(dst, [10, 20, 30, 255]);
    }

    #[test]
    fn test_pixel_rgba_to_rgb_drops_alpha() {
        let src = [10u8, 20, 30, 40];
        let mut dst = [0u8; 12];
        convert_pixel(PixelFormat::UInt8, 4, &src, PixelFormat::Float, 3, &mut dst);
        let g = read_sample(PixelFormat::Float, &dst[4..]).to_float();
        assert!((g - 20.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_pixel_gray_to_rgb_fills_zero() {
        let src = [200u8];
        let mut dst = [9u8; 3];
        convert_pixel(PixelFormat::UInt8, 1, &src, PixelFormat::UInt8, 3, &mut dst);
        assert_eq!(dst, [200, 0, 0]);
    }
}
