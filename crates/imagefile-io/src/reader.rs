//! Generic image file reader.
//!
//! The extension picks the backend. The file's magic number is checked
//! too, and when it names a different known format that backend is used
//! instead, so a PNG saved as `.jpg` still opens.

use crate::detect::codec_for_path;
use crate::traits::{DecodedImage, ImageCodec};
use crate::{Format, IoResult, ReadOptions};
use imagefile_core::Image;
use std::path::Path;
use tracing::{debug, warn};

/// Reads image files into owned [`Image`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericImageFileReader {
    options: ReadOptions,
}

impl GenericImageFileReader {
    /// Creates a reader with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reader with explicit options.
    pub fn with_options(options: ReadOptions) -> Self {
        Self { options }
    }

    /// Read options.
    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Reads the image stored at `path`.
    ///
    /// Multi-image files yield their first layer or page.
    ///
    /// # Errors
    ///
    /// - [`IoError::UnsupportedFormat`](crate::IoError::UnsupportedFormat)
    ///   for unknown extensions; the file is not opened.
    /// - [`IoError::Io`](crate::IoError::Io) if the file cannot be read.
    /// - [`IoError::DecodeError`](crate::IoError::DecodeError) for corrupt
    ///   or truncated data.
    pub fn read(&self, path: impl AsRef<Path>) -> IoResult<Image> {
        self.read_with_attributes(path).map(|decoded| decoded.image)
    }

    /// Reads the image and the metadata the file carried.
    pub fn read_with_attributes(&self, path: impl AsRef<Path>) -> IoResult<DecodedImage> {
        let path = path.as_ref();
        let by_extension = codec_for_path(path)?;
        let data = std::fs::read(path)?;
        let codec = sniff(by_extension, &data, path);

        debug!(
            path = %path.display(),
            format = %codec.format(),
            bytes = data.len(),
            "reading image file"
        );
        codec.decode(&data, &self.options)
    }
}

/// Prefers the backend named by the magic number when it disagrees with
/// the extension.
fn sniff(
    by_extension: &'static dyn ImageCodec,
    data: &[u8],
    path: &Path,
) -> &'static dyn ImageCodec {
    let sniffed = Format::from_bytes(data);
    if sniffed == Format::Unknown || sniffed == by_extension.format() {
        return by_extension;
    }
    match sniffed.codec() {
        Some(codec) => {
            warn!(
                path = %path.display(),
                extension = %by_extension.format(),
                content = %sniffed,
                "file content does not match its extension"
            );
            codec
        }
        None => by_extension,
    }
}
