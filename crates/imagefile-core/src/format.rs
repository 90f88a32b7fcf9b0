//! Pixel storage formats and color encodings.
//!
//! # Types
//!
//! - [`PixelFormat`] - Numeric type of one channel (UInt8, UInt16, UInt32, Half, Float)
//! - [`ColorEncoding`] - Whether channel values are linear light or sRGB encoded
//!
//! # Usage
//!
//! ```rust
//! use imagefile_core::PixelFormat;
//!
//! // OpenEXR stores half floats
//! let exr = PixelFormat::Half;
//! assert_eq!(exr.size(), 2);
//! assert!(exr.is_float());
//!
//! // 16-bit TIFF
//! assert_eq!(PixelFormat::UInt16.max_value(), 65535);
//! ```

/// Numeric storage layout of one channel.
///
/// Integer formats hold normalized values: `0..=max_value()` maps onto
/// `0.0..=1.0` when converted to or from a float format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// 8-bit unsigned integer.
    #[default]
    UInt8,
    /// 16-bit unsigned integer.
    UInt16,
    /// 32-bit unsigned integer.
    UInt32,
    /// 16-bit half-precision float.
    Half,
    /// 32-bit single-precision float.
    Float,
}

impl PixelFormat {
    /// All formats, in declaration order.
    pub const ALL: [PixelFormat; 5] = [
        Self::UInt8,
        Self::UInt16,
        Self::UInt32,
        Self::Half,
        Self::Float,
    ];

    /// Number of bytes per channel.
    #[inline]
    pub const fn size(&self) -> usize {
        match self {
            Self::UInt8 => 1,
            Self::UInt16 => 2,
            Self::UInt32 => 4,
            Self::Half => 2,
            Self::Float => 4,
        }
    }

    /// Number of bits per channel.
    #[inline]
    pub const fn bits(&self) -> u32 {
        self.size() as u32 * 8
    }

    /// Whether this is a floating-point format.
    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Half | Self::Float)
    }

    /// Whether this is an integer format.
    #[inline]
    pub const fn is_integer(&self) -> bool {
        !self.is_float()
    }

    /// Maximum integer value, i.e. the value that maps to 1.0.
    ///
    /// Returns 1 for float formats.
    #[inline]
    pub const fn max_value(&self) -> u32 {
        match self {
            Self::UInt8 => u8::MAX as u32,
            Self::UInt16 => u16::MAX as u32,
            Self::UInt32 => u32::MAX,
            Self::Half | Self::Float => 1,
        }
    }

    /// Short name for display.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::Half => "half",
            Self::Float => "float",
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Color encoding of the RGB channels of a pixel buffer.
///
/// Images do not carry this; it describes what a file format stores
/// natively and what a caller declares its pixels to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorEncoding {
    /// Linear light.
    #[default]
    Linear,
    /// sRGB transfer curve (IEC 61966-2-1).
    Srgb,
}

impl ColorEncoding {
    /// Name stored in the `color_space` image attribute.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Srgb => "sRGB",
        }
    }
}

impl std::fmt::Display for ColorEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
