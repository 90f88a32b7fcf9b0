//! Codec backend interface.
//!
//! Every container format implements [`ImageCodec`]: a stateless object
//! that encodes whole images to bytes and decodes bytes to an image. The
//! generic reader and writer pick one through [`Format::codec`].
//!
//! Each backend also publishes a [`CodecCapabilities`] table describing
//! what it stores natively:
//!
//! | Format | Channels | Bit depth | Encoding |
//! |--------|----------|-----------|----------|
//! | EXR    | 4        | Half      | linear   |
//! | HDR    | 3        | RGBE      | linear   |
//! | TIFF   | 4        | UInt16    | linear   |
//! | BMP    | 4        | UInt8     | sRGB     |
//! | PNG    | 4        | UInt8     | sRGB     |
//! | JPEG   | 3        | UInt8     | sRGB     |

use crate::{Format, IoError, IoResult, ReadOptions, WriteOptions};
use imagefile_core::attributes::{COLOR_SPACE, SOFTWARE};
use imagefile_core::transfer::reencode_in_place;
use imagefile_core::{ColorEncoding, Component, Image, ImageAttributes, PixelFormat};
use tracing::warn;

/// What a backend stores natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecCapabilities {
    /// Channels written to the file.
    pub native_channels: usize,
    /// Default stored bit depth.
    pub native_format: PixelFormat,
    /// Color encoding the stored values are assumed to be in.
    pub native_encoding: ColorEncoding,
    /// Whether an alpha channel survives a round trip.
    pub supports_alpha: bool,
    /// Whether several images can be stored in one file.
    pub multi_image: bool,
    /// Whether encoding is lossy.
    pub lossy: bool,
    /// Bit depths accepted through [`WriteOptions::output_format`].
    pub output_formats: &'static [PixelFormat],
}

impl CodecCapabilities {
    /// Resolves the stored bit depth for a write.
    pub fn output_format(&self, requested: Option<PixelFormat>) -> IoResult<PixelFormat> {
        match requested {
            None => Ok(self.native_format),
            Some(f) if self.output_formats.contains(&f) => Ok(f),
            Some(f) => Err(IoError::UnsupportedPixelLayout(format!(
                "{f} output is not available, expected one of {:?}",
                self.output_formats
            ))),
        }
    }
}

/// One image handed to [`ImageCodec::encode`].
#[derive(Debug, Clone, Copy)]
pub struct EncodeEntry<'a> {
    /// Pixels to write.
    pub image: &'a Image,
    /// Metadata to store where the container allows.
    pub attributes: &'a ImageAttributes,
}

/// Result of [`ImageCodec::decode`].
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Decoded pixels in the file's native layout.
    pub image: Image,
    /// Metadata found in the file, plus `color_space`.
    pub attributes: ImageAttributes,
}

/// A container format backend.
///
/// Implementations are stateless; one static instance per format is
/// returned by [`Format::codec`].
pub trait ImageCodec: std::fmt::Debug + Send + Sync {
    /// Format handled by this backend.
    fn format(&self) -> Format;

    /// Native capability table.
    fn capabilities(&self) -> &'static CodecCapabilities;

    /// Encodes one or more images into a complete file.
    ///
    /// Backends without multi-image support reject more than one entry.
    fn encode(&self, images: &[EncodeEntry<'_>], options: &WriteOptions) -> IoResult<Vec<u8>>;

    /// Decodes a complete file. Multi-image files yield the first image.
    fn decode(&self, data: &[u8], options: &ReadOptions) -> IoResult<DecodedImage>;

    /// Returns true if `header` carries this format's magic number.
    fn can_read(&self, header: &[u8]) -> bool {
        Format::from_bytes(header) == self.format()
    }
}

/// Fails unless the image has 3 or 4 channels.
pub fn check_layout(image: &Image) -> IoResult<()> {
    match image.channel_count() {
        3 | 4 => Ok(()),
        n => Err(IoError::UnsupportedPixelLayout(format!(
            "{n} channels, expected 3 or 4"
        ))),
    }
}

/// Returns the only entry, or fails for backends that store one image.
pub(crate) fn single_image<'a, 'b>(
    images: &'b [EncodeEntry<'a>],
    format: Format,
) -> IoResult<&'b EncodeEntry<'a>> {
    match images {
        [entry] => Ok(entry),
        [] => Err(IoError::MissingData("no image to write".into())),
        _ => Err(IoError::UnsupportedOperation(format!(
            "{format} stores a single image, got {}",
            images.len()
        ))),
    }
}

/// Converts an image into the interleaved buffer a backend stores.
///
/// Channels are padded or dropped to `channels`. When the caller declared
/// a source encoding that differs from the backend's, RGB channels are
/// re-encoded on the way through f32.
pub(crate) fn native_pixels<T: Component>(
    entry: &EncodeEntry<'_>,
    channels: usize,
    caps: &CodecCapabilities,
    options: &WriteOptions,
) -> Vec<T> {
    let image = entry.image;
    if image.channel_count() > channels && !caps.supports_alpha {
        warn!(
            channels = image.channel_count(),
            stored = channels,
            "alpha channel discarded"
        );
    }

    match options.source_encoding {
        Some(src) if src != caps.native_encoding => {
            let mut data = image.to_interleaved::<f32>(channels);
            reencode_in_place(&mut data, channels, src, caps.native_encoding);
            data.into_iter().map(T::from_f32).collect()
        }
        _ => image.to_interleaved::<T>(channels),
    }
}

/// Logs attributes a backend has no place for.
///
/// `color_space` and `software` are implied by every file and never
/// reported.
pub(crate) fn warn_unstored(attributes: &ImageAttributes, stored: &[&str], format: Format) {
    for (key, _) in attributes.iter() {
        if key != COLOR_SPACE && key != SOFTWARE && !stored.contains(&key) {
            warn!(%format, key, "attribute not stored");
        }
    }
}

/// Reports a read past the end of an in-memory file as corrupt data.
pub(crate) fn truncated(format: Format) -> impl Fn(IoError) -> IoError {
    move |e| match e {
        IoError::Io(e) => IoError::DecodeError(format!("{format}: {e}")),
        other => other,
    }
}

/// Attributes every decoder starts from.
pub(crate) fn decoded_attributes(encoding: ColorEncoding) -> ImageAttributes {
    let mut attrs = ImageAttributes::new();
    attrs.insert(COLOR_SPACE, encoding.name());
    attrs
}

/// Checks that image dimensions fit a container's size fields.
pub(crate) fn check_dimensions(image: &Image, max: usize, format: Format) -> IoResult<()> {
    let (w, h) = image.dimensions();
    if w > max || h > max {
        return Err(IoError::UnsupportedPixelLayout(format!(
            "{w}x{h} exceeds the {format} limit of {max}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagefile_core::{Color4b, Color4f};

    const CAPS: CodecCapabilities = CodecCapabilities {
        native_channels: 4,
        native_format: PixelFormat::UInt8,
        native_encoding: ColorEncoding::Srgb,
        supports_alpha: true,
        multi_image: false,
        lossy: false,
        output_formats: &[PixelFormat::UInt8, PixelFormat::UInt16],
    };

    #[test]
    fn test_output_format() {
        assert_eq!(CAPS.output_format(None).unwrap(), PixelFormat::UInt8);
        assert_eq!(
            CAPS.output_format(Some(PixelFormat::UInt16)).unwrap(),
            PixelFormat::UInt16
        );
        assert!(matches!(
            CAPS.output_format(Some(PixelFormat::Half)),
            Err(IoError::UnsupportedPixelLayout(_))
        ));
    }

    #[test]
    fn test_check_layout() {
        let img = Image::new(1, 1, 1, 1, 2, PixelFormat::UInt8).unwrap();
        assert!(matches!(check_layout(&img), Err(IoError::UnsupportedPixelLayout(_))));
        let img = Image::new(1, 1, 1, 1, 3, PixelFormat::UInt8).unwrap();
        assert!(check_layout(&img).is_ok());
    }

    #[test]
    fn test_single_image() {
        let img = Image::new(1, 1, 1, 1, 3, PixelFormat::UInt8).unwrap();
        let attrs = ImageAttributes::new();
        let entry = EncodeEntry { image: &img, attributes: &attrs };

        assert!(single_image(&[entry], Format::Png).is_ok());
        assert!(matches!(single_image(&[], Format::Png), Err(IoError::MissingData(_))));
        assert!(matches!(
            single_image(&[entry, entry], Format::Png),
            Err(IoError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_native_pixels_reencodes() {
        let mut img = Image::new(1, 1, 1, 1, 4, PixelFormat::Float).unwrap();
        img.clear(Color4f::new(0.214, 0.214, 0.214, 0.5));
        let attrs = ImageAttributes::new();
        let entry = EncodeEntry { image: &img, attributes: &attrs };

        let plain: Vec<u8> = native_pixels(&entry, 4, &CAPS, &WriteOptions::default());
        assert_eq!(plain, vec![55, 55, 55, 128]);

        let options = WriteOptions::default().with_source_encoding(ColorEncoding::Linear);
        let encoded: Vec<u8> = native_pixels(&entry, 4, &CAPS, &options);
        assert!((i32::from(encoded[0]) - 128).abs() <= 1);
        assert_eq!(encoded[3], 128);
    }

    #[test]
    fn test_native_pixels_pads_alpha() {
        let mut img = Image::new(1, 1, 1, 1, 3, PixelFormat::UInt8).unwrap();
        img.clear(Color4b::new(1, 2, 3, 4));
        let attrs = ImageAttributes::new();
        let entry = EncodeEntry { image: &img, attributes: &attrs };
        let px: Vec<u8> = native_pixels(&entry, 4, &CAPS, &WriteOptions::default());
        assert_eq!(px, vec![1, 2, 3, 255]);
    }
}
