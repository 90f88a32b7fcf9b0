//! Format detection utilities.
//!
//! Detects image formats from file extensions and magic bytes.

use crate::traits::ImageCodec;
use crate::{IoError, IoResult};
use std::path::Path;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Windows bitmap.
    Bmp,
    /// OpenEXR format.
    Exr,
    /// Radiance HDR (RGBE) format.
    Hdr,
    /// JPEG format.
    Jpeg,
    /// PNG format.
    Png,
    /// TIFF format.
    Tiff,
    /// Unknown/unsupported format.
    Unknown,
}

impl Format {
    /// Every known format.
    pub const ALL: [Format; 6] = [
        Format::Bmp,
        Format::Exr,
        Format::Hdr,
        Format::Jpeg,
        Format::Png,
        Format::Tiff,
    ];

    /// Detects format from file extension only (case-insensitive).
    pub fn from_extension<P: AsRef<Path>>(path: P) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("bmp") => Format::Bmp,
            Some("exr") => Format::Exr,
            Some("hdr") => Format::Hdr,
            Some("jpg") | Some("jpeg") | Some("jpe") | Some("jif") | Some("jfif")
            | Some("jfi") => Format::Jpeg,
            Some("png") => Format::Png,
            Some("tif") | Some("tiff") => Format::Tiff,
            _ => Format::Unknown,
        }
    }

    /// Detects format from raw bytes (magic number check).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        // EXR: 0x76 0x2f 0x31 0x01
        if bytes.starts_with(&[0x76, 0x2f, 0x31, 0x01]) {
            return Format::Exr;
        }

        // PNG: 0x89 P N G \r \n 0x1A \n
        if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Format::Png;
        }

        // JPEG: SOI followed by any marker
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Format::Jpeg;
        }

        // TIFF: II*\0 (little-endian) or MM\0* (big-endian)
        if bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
        {
            return Format::Tiff;
        }

        // HDR: "#?" (#?RADIANCE, #?RGBE)
        if bytes.starts_with(b"#?") {
            return Format::Hdr;
        }

        // BMP: "BM"
        if bytes.starts_with(b"BM") {
            return Format::Bmp;
        }

        Format::Unknown
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Format::Bmp => "BMP",
            Format::Exr => "OpenEXR",
            Format::Hdr => "Radiance HDR",
            Format::Jpeg => "JPEG",
            Format::Png => "PNG",
            Format::Tiff => "TIFF",
            Format::Unknown => "unknown",
        }
    }

    /// Accepted extensions, lowercase, without dots.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Format::Bmp => &["bmp"],
            Format::Exr => &["exr"],
            Format::Hdr => &["hdr"],
            Format::Jpeg => &["jpg", "jpeg", "jpe", "jif", "jfif", "jfi"],
            Format::Png => &["png"],
            Format::Tiff => &["tif", "tiff"],
            Format::Unknown => &[],
        }
    }

    /// Returns the typical file extension for this format.
    pub fn extension(&self) -> &'static str {
        self.extensions().first().copied().unwrap_or("")
    }

    /// Codec backend for this format, if compiled in.
    pub fn codec(&self) -> Option<&'static dyn ImageCodec> {
        match self {
            #[cfg(feature = "bmp")]
            Format::Bmp => Some(&crate::bmp::BmpCodec),
            #[cfg(feature = "exr")]
            Format::Exr => Some(&crate::exr::ExrCodec),
            #[cfg(feature = "hdr")]
            Format::Hdr => Some(&crate::hdr::HdrCodec),
            #[cfg(feature = "jpeg")]
            Format::Jpeg => Some(&crate::jpeg::JpegCodec),
            #[cfg(feature = "png")]
            Format::Png => Some(&crate::png::PngCodec),
            #[cfg(feature = "tiff")]
            Format::Tiff => Some(&crate::tiff::TiffCodec),
            _ => None,
        }
    }
}

/// Backend selected by a path's extension.
///
/// Fails with [`IoError::UnsupportedFormat`] for unknown extensions and for
/// formats compiled out of this build.
pub(crate) fn codec_for_path(path: &Path) -> IoResult<&'static dyn ImageCodec> {
    Format::from_extension(path).codec().ok_or_else(|| {
        IoError::UnsupportedFormat(
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or("no extension")
                .to_string(),
        )
    })
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
