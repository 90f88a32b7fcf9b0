//! Generic image file writer.
//!
//! Collects one or more images, then encodes them with the backend chosen
//! by the output path's extension.
//!
//! ```rust,no_run
//! use imagefile_io::GenericImageFileWriter;
//! use imagefile_core::{Color4b, Image, PixelFormat};
//!
//! let mut image = Image::new(16, 16, 16, 16, 4, PixelFormat::UInt8)?;
//! image.clear(Color4b::new(50, 100, 150, 42));
//!
//! let mut writer = GenericImageFileWriter::new("out.tif");
//! writer.append_image(&image);
//! writer.write()?;
//! # Ok::<(), imagefile_io::IoError>(())
//! ```

use crate::detect::codec_for_path;
use crate::traits::{EncodeEntry, check_layout};
use crate::{IoError, IoResult, WriteOptions};
use imagefile_core::{Image, ImageAttributes, create_default_attributes};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, PersistError};
use tracing::{debug, warn};

/// Writes borrowed images to one file.
///
/// The writer never owns pixels: every appended [`Image`] must outlive it.
/// Nothing touches the file system until [`write`](Self::write).
#[derive(Debug)]
pub struct GenericImageFileWriter<'a> {
    path: PathBuf,
    options: WriteOptions,
    images: Vec<(&'a Image, ImageAttributes)>,
}

impl<'a> GenericImageFileWriter<'a> {
    /// Creates a writer for `path` with default options.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_options(path, WriteOptions::default())
    }

    /// Creates a writer for `path` with explicit options.
    pub fn with_options(path: impl AsRef<Path>, options: WriteOptions) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options,
            images: Vec::new(),
        }
    }

    /// Output path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write options.
    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Appends an image. Its attributes start as [`create_default_attributes`].
    pub fn append_image(&mut self, image: &'a Image) -> &mut Self {
        self.images.push((image, create_default_attributes()));
        self
    }

    /// Merges `attributes` into those of the most recently appended image.
    pub fn set_image_attributes(&mut self, attributes: &ImageAttributes) -> IoResult<()> {
        let (_, attrs) = self
            .images
            .last_mut()
            .ok_or_else(|| IoError::MissingData("no image appended".into()))?;
        attrs.merge(attributes);
        Ok(())
    }

    /// Number of appended images.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Encodes every appended image and writes the file.
    ///
    /// # Errors
    ///
    /// - [`IoError::UnsupportedFormat`] if no backend handles the extension;
    ///   no file is created.
    /// - [`IoError::MissingData`] if no image was appended.
    /// - [`IoError::UnsupportedPixelLayout`] for images that are not 3 or 4
    ///   channels, or an output format the backend does not offer.
    /// - [`IoError::UnsupportedOperation`] for several images on a
    ///   single-image backend.
    /// - [`IoError::Io`] if the file cannot be written. The file is replaced
    ///   in one rename, so a failed write leaves any existing file intact.
    pub fn write(&self) -> IoResult<()> {
        let codec = codec_for_path(&self.path)?;
        let format = codec.format();

        if self.images.is_empty() {
            return Err(IoError::MissingData("no image to write".into()));
        }
        for (image, _) in &self.images {
            check_layout(image)?;
        }
        if self.images.len() > 1 && !codec.capabilities().multi_image {
            return Err(IoError::UnsupportedOperation(format!(
                "{format} stores a single image, got {}",
                self.images.len()
            )));
        }

        let entries: Vec<EncodeEntry<'_>> = self
            .images
            .iter()
            .map(|(image, attributes)| EncodeEntry { image, attributes })
            .collect();
        let bytes = codec.encode(&entries, &self.options)?;

        debug!(
            path = %self.path.display(),
            %format,
            images = entries.len(),
            bytes = bytes.len(),
            "writing image file"
        );
        commit(&self.path, &bytes)
    }
}

/// Writes `bytes` to a temporary file beside `path`, then renames it over
/// `path`. On failure the temporary file is removed and an existing file
/// at `path` is left as it was.
fn commit(path: &Path, bytes: &[u8]) -> IoResult<()> {
    let target = resolve_symlink(path);
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = temp_file_in(dir)?;
    if let Err(e) = temp.write_all(bytes).and_then(|()| temp.as_file().sync_all()) {
        discard(temp);
        return Err(e.into());
    }
    temp.persist(&target).map_err(|PersistError { error, file }| {
        discard(file);
        IoError::Io(error)
    })?;
    Ok(())
}

/// Writing through a symlink replaces the file it points to, not the link.
fn resolve_symlink(path: &Path) -> PathBuf {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}

fn temp_file_in(dir: &Path) -> std::io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".imagefile-").suffix(".tmp");
    // Same mode as a plain create, before umask.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}

fn discard(temp: NamedTempFile) {
    let temp_path = temp.path().to_path_buf();
    if let Err(e) = temp.close() {
        warn!(
            path = %temp_path.display(),
            error = %e,
            "failed to remove temporary file"
        );
    }
}
