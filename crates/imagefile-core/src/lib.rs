//! # imagefile-core
//!
//! In-memory image model shared by every codec backend.
//!
//! - [`PixelFormat`] - Numeric storage layout of one channel
//! - [`Color`], [`Component`] - Fixed-size color values over any channel type
//! - [`Image`] - Tiled pixel grid with converting accessors
//! - [`ImageAttributes`] - Metadata carried through read/write
//! - [`convert`] - Conversion matrix between pixel formats
//! - [`transfer`] - sRGB transfer curve
//!
//! ## Example
//!
//! ```rust
//! use imagefile_core::{Color3f, Color4b, Image, PixelFormat};
//!
//! let mut img = Image::new(16, 16, 16, 16, 4, PixelFormat::UInt8).unwrap();
//! img.clear(Color4b::new(50, 100, 150, 42));
//!
//! let px: Color3f = img.get_pixel(3, 4);
//! assert!((px.r() - 50.0 / 255.0).abs() < 1e-6);
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//! imagefile-core (this crate)
//!    ^
//!    |
//!    +-- imagefile-io (codec backends, generic reader/writer)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod attributes;
pub mod color;
pub mod convert;
pub mod error;
pub mod format;
pub mod image;
pub mod transfer;

pub use attributes::{AttrValue, ImageAttributes, create_default_attributes};
pub use color::{
    Color, Color3b, Color3f, Color3h, Color4b, Color4f, Color4h, Component, linear_rgb_to_srgb,
    saturate, srgb_to_linear_rgb,
};
pub use error::{Error, Result};
pub use format::{ColorEncoding, PixelFormat};
pub use image::{Image, ImageProperties, Tile};

/// Re-export of the half-float type used by [`Color3h`] and [`Color4h`].
pub use half::f16;
