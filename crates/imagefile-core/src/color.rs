//! Fixed-size color values.
//!
//! A [`Color<T, N>`] is `N` channels of the scalar type `T`. With `N == 4`
//! the first three channels are RGB and the fourth is alpha; a 3-channel
//! color has no alpha and is treated as opaque wherever alpha matters.
//!
//! # Types
//!
//! - [`Component`] - Trait for channel scalars (u8, u16, u32, f16, f32)
//! - [`Color`] - N-channel color
//! - [`Color3b`], [`Color4b`], [`Color3f`], [`Color4f`], [`Color3h`], [`Color4h`] - Common aliases
//!
//! # Example
//!
//! ```
//! use imagefile_core::{Color3f, Color4b};
//!
//! let c = Color4b::new(50, 100, 150, 42);
//! assert_eq!(c.rgb(), imagefile_core::Color3b::new(50, 100, 150));
//!
//! let f: Color3f = c.rgb().convert();
//! assert!((f.g() - 100.0 / 255.0).abs() < 1e-6);
//! ```
//!
//! # Arithmetic
//!
//! Operators work element-wise through an f32 pivot. Integer results
//! saturate at the type's range; float results are unclamped.

use crate::convert::Sample;
use crate::transfer;
use crate::PixelFormat;
use half::f16;
use std::fmt;
use std::ops::{Add, Div, Index, IndexMut, Mul, Sub};

/// Trait for channel scalar types.
///
/// Integer types are normalized: `0..=MAX` maps to `0.0..=1.0`.
///
/// # Example
///
/// ```
/// use imagefile_core::Component;
///
/// assert_eq!(u8::from_f32(0.5), 128);
/// assert_eq!(u16::from_f32(1.0), 65535);
/// assert!((128u8.to_f32() - 0.502).abs() < 0.01);
/// ```
pub trait Component:
    Copy + Default + PartialEq + PartialOrd + fmt::Debug + Send + Sync + 'static
{
    /// Pixel format this type stores.
    const FORMAT: PixelFormat;

    /// Converts to a format-tagged sample.
    fn to_sample(self) -> Sample;

    /// Converts from a sample, rescaling and clamping as needed.
    fn from_sample(sample: Sample) -> Self;

    /// Zero value.
    fn zero() -> Self;

    /// Full intensity (1.0 for floats, MAX for integers).
    fn one() -> Self;

    /// Normalized f32 value.
    #[inline]
    fn to_f32(self) -> f32 {
        self.to_sample().to_float()
    }

    /// From a normalized f32 value.
    #[inline]
    fn from_f32(v: f32) -> Self {
        Self::from_sample(Sample::Float(v))
    }

    /// Normalized f64 value. Exact for every integer type.
    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self.to_f32())
    }

    /// From a normalized f64 value.
    #[inline]
    fn from_f64(v: f64) -> Self {
        Self::from_f32(v as f32)
    }

    /// Clamps to `[0, 1]`.
    #[inline]
    fn saturate(self) -> Self {
        Self::from_f32(self.to_f32().clamp(0.0, 1.0))
    }
}

macro_rules! int_component {
    ($t:ty, $fmt:ident) => {
        impl Component for $t {
            const FORMAT: PixelFormat = PixelFormat::$fmt;

            #[inline]
            fn to_sample(self) -> Sample {
                Sample::Int {
                    value: u32::from(self),
                    max: u32::from(<$t>::MAX),
                }
            }

            #[inline]
            fn from_sample(sample: Sample) -> Self {
                sample.to_int(u32::from(<$t>::MAX)) as $t
            }

            #[inline]
            fn zero() -> Self {
                0
            }

            #[inline]
            fn one() -> Self {
                <$t>::MAX
            }

            #[inline]
            fn to_f64(self) -> f64 {
                f64::from(self) / f64::from(<$t>::MAX)
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                (v.clamp(0.0, 1.0) * f64::from(<$t>::MAX)).round() as $t
            }

            #[inline]
            fn saturate(self) -> Self {
                self
            }
        }
    };
}

int_component!(u8, UInt8);
int_component!(u16, UInt16);
int_component!(u32, UInt32);

impl Component for f16 {
    const FORMAT: PixelFormat = PixelFormat::Half;

    #[inline]
    fn to_sample(self) -> Sample {
        Sample::Float(self.to_f32())
    }

    #[inline]
    fn from_sample(sample: Sample) -> Self {
        f16::from_f32(sample.to_float())
    }

    #[inline]
    fn zero() -> Self {
        f16::ZERO
    }

    #[inline]
    fn one() -> Self {
        f16::ONE
    }
}

impl Component for f32 {
    const FORMAT: PixelFormat = PixelFormat::Float;

    #[inline]
    fn to_sample(self) -> Sample {
        Sample::Float(self)
    }

    #[inline]
    fn from_sample(sample: Sample) -> Self {
        sample.to_float()
    }

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn one() -> Self {
        1.0
    }
}

/// An N-channel color.
#[repr(C)]
#[derive(Clone, Copy, PartialEq)]
pub struct Color<T: Component, const N: usize>(pub [T; N]);

/// 3-channel 8-bit color.
pub type Color3b = Color<u8, 3>;
/// 4-channel 8-bit color.
pub type Color4b = Color<u8, 4>;
/// 3-channel f32 color.
pub type Color3f = Color<f32, 3>;
/// 4-channel f32 color.
pub type Color4f = Color<f32, 4>;
/// 3-channel half color.
pub type Color3h = Color<f16, 3>;
/// 4-channel half color.
pub type Color4h = Color<f16, 4>;

impl<T: Component, const N: usize> Color<T, N> {
    /// Number of channels.
    pub const CHANNELS: usize = N;

    /// Creates a color from a channel array.
    #[inline]
    pub const fn from_array(channels: [T; N]) -> Self {
        Self(channels)
    }

    /// Creates a color with every channel set to `v`.
    #[inline]
    pub fn splat(v: T) -> Self {
        Self([v; N])
    }

    /// Returns the channel array.
    #[inline]
    pub fn to_array(self) -> [T; N] {
        self.0
    }

    /// Channels as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    /// Applies `f` to every channel.
    #[inline]
    pub fn map<F: Fn(T) -> T>(self, f: F) -> Self {
        Self(self.0.map(f))
    }

    /// Applies `f` to every channel through normalized f32.
    #[inline]
    pub fn map_f32<F: Fn(f32) -> f32>(self, f: F) -> Self {
        Self(self.0.map(|c| T::from_f32(f(c.to_f32()))))
    }

    /// Converts every channel to another scalar type.
    ///
    /// This is a range rescale (`u8 255` becomes `1.0`), not a color
    /// space transform.
    #[inline]
    pub fn convert<U: Component>(self) -> Color<U, N> {
        Color(self.0.map(|c| U::from_sample(c.to_sample())))
    }

    /// Clamps every channel to `[0, 1]`.
    #[inline]
    pub fn saturate(self) -> Self {
        self.map(Component::saturate)
    }

    /// Applies the sRGB OETF to the RGB channels.
    pub fn linear_rgb_to_srgb(self) -> Self {
        self.map_rgb_f32(transfer::srgb_oetf)
    }

    /// Applies the sRGB EOTF to the RGB channels.
    pub fn srgb_to_linear_rgb(self) -> Self {
        self.map_rgb_f32(transfer::srgb_eotf)
    }

    fn map_rgb_f32(mut self, f: fn(f32) -> f32) -> Self {
        for c in self.0.iter_mut().take(3) {
            *c = T::from_f32(f(c.to_f32()));
        }
        self
    }

    /// Largest per-channel absolute difference, in normalized units.
    pub fn max_abs_diff(&self, other: &Self) -> f32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a.to_f32() - b.to_f32()).abs())
            .fold(0.0, f32::max)
    }

    /// Whether every channel is within `eps` of `other` (normalized units).
    #[inline]
    pub fn approx_eq(&self, other: &Self, eps: f32) -> bool {
        self.max_abs_diff(other) <= eps
    }
}

impl<T: Component> Color<T, 3> {
    /// Creates an RGB color.
    #[inline]
    pub const fn new(r: T, g: T, b: T) -> Self {
        Self([r, g, b])
    }

    /// Red.
    #[inline]
    pub fn r(&self) -> T {
        self.0[0]
    }

    /// Green.
    #[inline]
    pub fn g(&self) -> T {
        self.0[1]
    }

    /// Blue.
    #[inline]
    pub fn b(&self) -> T {
        self.0[2]
    }

    /// Adds an alpha channel.
    #[inline]
    pub fn with_alpha(self, a: T) -> Color<T, 4> {
        Color([self.0[0], self.0[1], self.0[2], a])
    }
}

impl<T: Component> Color<T, 4> {
    /// Creates an RGBA color.
    #[inline]
    pub const fn new(r: T, g: T, b: T, a: T) -> Self {
        Self([r, g, b, a])
    }

    /// Creates an RGBA color from RGB and alpha.
    #[inline]
    pub fn from_rgb(rgb: Color<T, 3>, a: T) -> Self {
        rgb.with_alpha(a)
    }

    /// Red.
    #[inline]
    pub fn r(&self) -> T {
        self.0[0]
    }

    /// Green.
    #[inline]
    pub fn g(&self) -> T {
        self.0[1]
    }

    /// Blue.
    #[inline]
    pub fn b(&self) -> T {
        self.0[2]
    }

    /// Alpha.
    #[inline]
    pub fn a(&self) -> T {
        self.0[3]
    }

    /// RGB part.
    #[inline]
    pub fn rgb(&self) -> Color<T, 3> {
        Color([self.0[0], self.0[1], self.0[2]])
    }

    /// Replaces the RGB part, keeping alpha.
    #[inline]
    pub fn set_rgb(&mut self, rgb: Color<T, 3>) {
        self.0[..3].copy_from_slice(&rgb.0);
    }

    /// Premultiplies RGB by alpha: `(R, G, B, A) -> (R*A, G*A, B*A, A)`.
    pub fn premultiply_in_place(&mut self) {
        let a = self.0[3].to_f32();
        for c in &mut self.0[..3] {
            *c = T::from_f32(c.to_f32() * a);
        }
    }

    /// Divides RGB by alpha.
    ///
    /// No-op for opaque colors. A zero (or negative) alpha yields zero RGB.
    pub fn unpremultiply_in_place(&mut self) {
        if self.0[3] == T::one() {
            return;
        }
        let a = self.0[3].to_f32();
        if a <= 0.0 {
            for c in &mut self.0[..3] {
                *c = T::zero();
            }
            return;
        }
        let inv_a = 1.0 / a;
        for c in &mut self.0[..3] {
            *c = T::from_f32(c.to_f32() * inv_a);
        }
    }

    /// Returns a premultiplied copy.
    #[inline]
    pub fn premultiply(mut self) -> Self {
        self.premultiply_in_place();
        self
    }

    /// Returns an unpremultiplied copy.
    #[inline]
    pub fn unpremultiply(mut self) -> Self {
        self.unpremultiply_in_place();
        self
    }

    /// Whether alpha is at full intensity.
    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.0[3].to_f32() >= 1.0
    }
}

/// Clamps every channel of `c` to `[0, 1]`.
#[inline]
pub fn saturate<T: Component, const N: usize>(c: Color<T, N>) -> Color<T, N> {
    c.saturate()
}

/// Applies the sRGB OETF to the RGB channels of `c`.
#[inline]
pub fn linear_rgb_to_srgb<T: Component, const N: usize>(c: Color<T, N>) -> Color<T, N> {
    c.linear_rgb_to_srgb()
}

/// Applies the sRGB EOTF to the RGB channels of `c`.
#[inline]
pub fn srgb_to_linear_rgb<T: Component, const N: usize>(c: Color<T, N>) -> Color<T, N> {
    c.srgb_to_linear_rgb()
}

impl<T: Component, const N: usize> Default for Color<T, N> {
    fn default() -> Self {
        Self([T::zero(); N])
    }
}

impl<T: Component, const N: usize> From<[T; N]> for Color<T, N> {
    fn from(channels: [T; N]) -> Self {
        Self(channels)
    }
}

impl<T: Component, const N: usize> Index<usize> for Color<T, N> {
    type Output = T;

    #[inline]
    fn index(&self, i: usize) -> &T {
        &self.0[i]
    }
}

impl<T: Component, const N: usize> IndexMut<usize> for Color<T, N> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.0[i]
    }
}

impl<T: Component, const N: usize> fmt::Debug for Color<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Color{}{:?}", N, self.0)
    }
}

impl<T: Component + fmt::Display, const N: usize> fmt::Display for Color<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, ")")
    }
}

// ============================================================================
// Arithmetic Operations
// ============================================================================

// Channels meet as normalized f64, which holds every u32 exactly. Integer
// results are clamped to the type's range.
macro_rules! color_binop {
    ($trait:ident, $method:ident, $op:tt) => {
        impl<T: Component, const N: usize> $trait for Color<T, N> {
            type Output = Self;

            #[inline]
            fn $method(self, rhs: Self) -> Self::Output {
                Self(std::array::from_fn(|i| {
                    T::from_f64(self.0[i].to_f64() $op rhs.0[i].to_f64())
                }))
            }
        }
    };
}

color_binop!(Add, add, +);
color_binop!(Sub, sub, -);
color_binop!(Mul, mul, *);
color_binop!(Div, div, /);

impl<T: Component, const N: usize> Mul<f32> for Color<T, N> {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f32) -> Self::Output {
        self.map_f32(|c| c * rhs)
    }
}
