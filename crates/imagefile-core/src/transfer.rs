//! sRGB transfer function.
//!
//! The sRGB standard uses a piecewise function combining a linear segment
//! near black with a power curve (approximately gamma 2.2) for the rest.
//!
//! # Range
//!
//! - Input/Output: [0, 1]
//!
//! # Reference
//!
//! IEC 61966-2-1:1999

use crate::ColorEncoding;

/// sRGB EOTF: decodes sRGB encoded values to linear light.
///
/// # Formula
///
/// ```text
/// if V <= 0.04045:
///     L = V / 12.92
/// else:
///     L = ((V + 0.055) / 1.055)^2.4
/// ```
///
/// # Example
///
/// ```rust
/// use imagefile_core::transfer::srgb_eotf;
///
/// let linear = srgb_eotf(0.5);
/// assert!((linear - 0.214).abs() < 0.01);
/// ```
#[inline]
pub fn srgb_eotf(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB OETF: encodes linear light to sRGB.
///
/// # Formula
///
/// ```text
/// if L <= 0.0031308:
///     V = L * 12.92
/// else:
///     V = 1.055 * L^(1/2.4) - 0.055
/// ```
#[inline]
pub fn srgb_oetf(l: f32) -> f32 {
    if l <= 0.0031308 {
        l * 12.92
    } else {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    }
}

/// Applies `f` to the RGB channels of an interleaved buffer.
///
/// Channel 3 and beyond (alpha) are left untouched.
fn apply_rgb(data: &mut [f32], channels: usize, f: fn(f32) -> f32) {
    if channels == 0 {
        return;
    }
    let rgb = channels.min(3);
    for px in data.chunks_exact_mut(channels) {
        for v in &mut px[..rgb] {
            *v = f(*v);
        }
    }
}

/// Encodes the RGB channels of an interleaved linear buffer to sRGB.
pub fn linear_to_srgb_in_place(data: &mut [f32], channels: usize) {
    apply_rgb(data, channels, srgb_oetf);
}

/// Decodes the RGB channels of an interleaved sRGB buffer to linear.
pub fn srgb_to_linear_in_place(data: &mut [f32], channels: usize) {
    apply_rgb(data, channels, srgb_eotf);
}

/// Re-encodes RGB channels from one color encoding to another.
///
/// No-op when `from == to`.
pub fn reencode_in_place(data: &mut [f32], channels: usize, from: ColorEncoding, to: ColorEncoding) {
    match (from, to) {
        (ColorEncoding::Linear, ColorEncoding::Srgb) => linear_to_srgb_in_place(data, channels),
        (ColorEncoding::Srgb, ColorEncoding::Linear) => srgb_to_linear_in_place(data, channels),
        _ => {}
    }
}
