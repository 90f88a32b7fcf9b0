//! # imagefile-io
//!
//! Image file reading and writing on top of [`imagefile_core::Image`].
//!
//! - **BMP** - 8-bit RGBA, uncompressed
//! - **EXR** - OpenEXR, half or float linear RGBA, multi-layer
//! - **HDR** - Radiance RGBE, float linear RGB
//! - **JPEG** - Lossy 8-bit RGB
//! - **PNG** - Lossless 8/16-bit RGBA with text metadata
//! - **TIFF** - 8/16-bit or float RGBA, multi-page
//!
//! # Architecture
//!
//! - [`ImageCodec`] - One stateless backend per container format
//! - [`GenericImageFileWriter`] - Picks a backend from the output extension
//! - [`GenericImageFileReader`] - Picks a backend from the extension and
//!   magic number
//! - [`read`] / [`write`] - One-call shortcuts
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use imagefile_core::{Color3f, Image, PixelFormat};
//!
//! let mut image = Image::new(2, 2, 2, 2, 3, PixelFormat::Float)?;
//! image.clear(Color3f::new(0.6, 0.7, 0.8));
//!
//! imagefile_io::write("preview.jpg", &image)?;
//! let back = imagefile_io::read("preview.jpg")?;
//! let px: Color3f = back.get_pixel(0, 0);
//! assert!(px.approx_eq(&Color3f::new(0.6, 0.7, 0.8), 0.003));
//! # Ok::<(), imagefile_io::IoError>(())
//! ```
//!
//! # Conversions
//!
//! Backends store their native layout (see [`CodecCapabilities`]).
//! Missing alpha is written opaque, surplus alpha is dropped with a warning,
//! and bit depth is rescaled. Pixel values are stored as given; set
//! [`WriteOptions::source_encoding`] to have the sRGB curve applied.
//!
//! # Feature Flags
//!
//! - `bmp`, `exr`, `hdr`, `jpeg`, `png`, `tiff` - one per backend (all default)

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod detect;
mod error;
mod options;
mod reader;
mod traits;
mod writer;

#[cfg(feature = "bmp")]
pub mod bmp;

#[cfg(feature = "exr")]
pub mod exr;

#[cfg(feature = "hdr")]
pub mod hdr;

#[cfg(feature = "jpeg")]
pub mod jpeg;

#[cfg(feature = "png")]
pub mod png;

#[cfg(feature = "tiff")]
pub mod tiff;

pub use detect::Format;
pub use error::{IoError, IoResult};
pub use options::{
    DEFAULT_JPEG_QUALITY, DEFAULT_TILE_SIZE, ExrCompression, ReadOptions, WriteOptions,
};
pub use reader::GenericImageFileReader;
pub use traits::{CodecCapabilities, DecodedImage, EncodeEntry, ImageCodec, check_layout};
pub use writer::GenericImageFileWriter;

use imagefile_core::Image;
use std::path::Path;

/// Reads an image, choosing the backend from the extension.
///
/// # Example
///
/// ```rust,ignore
/// let image = imagefile_io::read("render.exr")?;
/// println!("{}x{}", image.width(), image.height());
/// ```
///
/// # Errors
///
/// Returns an error if:
/// - The extension is not supported
/// - The file cannot be opened
/// - The file is corrupt or truncated
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<Image> {
    GenericImageFileReader::new().read(path)
}

/// Writes one image, choosing the backend from the extension.
///
/// # Errors
///
/// Returns an error if:
/// - The extension is not supported (no file is created)
/// - The image layout cannot be stored by the backend
/// - The file cannot be created
pub fn write<P: AsRef<Path>>(path: P, image: &Image) -> IoResult<()> {
    let mut writer = GenericImageFileWriter::new(path);
    writer.append_image(image);
    writer.write()
}
