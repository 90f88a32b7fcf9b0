//! Read and write options.
//!
//! Options apply to every backend; each backend reads the fields that
//! concern it and ignores the rest.
//!
//! ```rust
//! use imagefile_io::{ExrCompression, WriteOptions};
//! use imagefile_core::PixelFormat;
//!
//! let options = WriteOptions::default()
//!     .with_jpeg_quality(90)
//!     .with_exr_compression(ExrCompression::Piz)
//!     .with_output_format(PixelFormat::Float);
//! assert_eq!(options.jpeg_quality, 90);
//! ```

use imagefile_core::{ColorEncoding, PixelFormat};

/// Default JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 98;

/// Default tile edge of decoded images.
pub const DEFAULT_TILE_SIZE: usize = 64;

/// EXR compression method. Only lossless methods are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExrCompression {
    /// No compression.
    None,
    /// RLE compression.
    Rle,
    /// ZIP compression (lossless, good compression).
    #[default]
    Zip,
    /// PIZ compression (lossless, best for noisy images).
    Piz,
}

/// Options for writing image files.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    /// JPEG quality level 1-100. Default: 98.
    pub jpeg_quality: u8,
    /// EXR compression. Default: ZIP.
    pub exr_compression: ExrCompression,
    /// Stored bit depth, overriding the backend's native one.
    ///
    /// Accepted: EXR Half/Float; TIFF UInt8/UInt16/Float; PNG UInt8/UInt16.
    /// Other requests fail with `UnsupportedPixelLayout`.
    pub output_format: Option<PixelFormat>,
    /// Encoding of the pixels handed to the writer.
    ///
    /// When set and different from the backend's native encoding, the
    /// sRGB curve is applied to RGB channels while encoding. `None` means
    /// the pixels already match the native encoding.
    pub source_encoding: Option<ColorEncoding>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            exr_compression: ExrCompression::default(),
            output_format: None,
            source_encoding: None,
        }
    }
}

impl WriteOptions {
    /// Sets JPEG quality, clamped to 1-100.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Sets EXR compression.
    pub fn with_exr_compression(mut self, compression: ExrCompression) -> Self {
        self.exr_compression = compression;
        self
    }

    /// Requests a stored bit depth.
    pub fn with_output_format(mut self, format: PixelFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    /// Declares the encoding of the source pixels.
    pub fn with_source_encoding(mut self, encoding: ColorEncoding) -> Self {
        self.source_encoding = Some(encoding);
        self
    }
}

/// Options for reading image files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Tile width of the decoded image.
    pub tile_width: usize,
    /// Tile height of the decoded image.
    pub tile_height: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
        }
    }
}

impl ReadOptions {
    /// Sets the tile size of decoded images.
    pub fn with_tile_size(mut self, width: usize, height: usize) -> Self {
        self.tile_width = width;
        self.tile_height = height;
        self
    }
}
