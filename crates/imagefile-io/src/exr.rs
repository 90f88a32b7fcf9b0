//! OpenEXR format support.
//!
//! Writes linear RGBA as half floats (32-bit float on request), one layer
//! per image named `layer0`, `layer1`, ... All compression methods offered
//! are lossless. `software`, `comment` and `author` map to the `software`,
//! `comments` and `owner` header attributes.
//!
//! Reading returns the first layer. Samples keep the type of the `R` (or
//! luminance `Y`) channel: half, float or uint. A `Y` channel expands to
//! RGB; `A` is kept when present.

use crate::options::ExrCompression;
use crate::traits::{
    CodecCapabilities, DecodedImage, EncodeEntry, ImageCodec, check_layout, decoded_attributes,
    native_pixels, warn_unstored,
};
use crate::{Format, IoError, IoResult, ReadOptions, WriteOptions};
use ::exr::compression::Compression;
use ::exr::image::{Blocks, Encoding, FlatSamples, Layer, SpecificChannels};
use ::exr::math::Vec2;
use ::exr::meta::attribute::{IntegerBounds, LineOrder, Text};
use ::exr::meta::header::LayerAttributes;
use ::exr::prelude::{ReadChannels, ReadLayers, WritableImage};
use half::f16;
use imagefile_core::attributes::{AUTHOR, COMMENT, SOFTWARE};
use imagefile_core::{ColorEncoding, Component, Image, ImageAttributes, PixelFormat};
use smallvec::SmallVec;
use std::io::Cursor;
use tracing::debug;

static CAPABILITIES: CodecCapabilities = CodecCapabilities {
    native_channels: 4,
    native_format: PixelFormat::Half,
    native_encoding: ColorEncoding::Linear,
    supports_alpha: true,
    multi_image: true,
    lossy: false,
    output_formats: &[PixelFormat::Half, PixelFormat::Float],
};

impl ExrCompression {
    fn to_exr(self) -> Compression {
        match self {
            ExrCompression::None => Compression::Uncompressed,
            ExrCompression::Rle => Compression::RLE,
            ExrCompression::Zip => Compression::ZIP16,
            ExrCompression::Piz => Compression::PIZ,
        }
    }
}

fn exr_decode_err(e: ::exr::error::Error) -> IoError {
    IoError::DecodeError(e.to_string())
}

fn exr_encode_err(e: ::exr::error::Error) -> IoError {
    IoError::EncodeError(e.to_string())
}

/// Header attributes for layer `index`.
fn layer_attributes(index: usize, attributes: &ImageAttributes) -> LayerAttributes {
    let mut attrs = LayerAttributes::named(format!("layer{index}").as_str());
    let text = |key: &str| attributes.get(key).and_then(|v| Text::new_or_none(v.to_string()));
    attrs.software_name = text(SOFTWARE);
    attrs.comments = text(COMMENT);
    attrs.owner = text(AUTHOR);
    attrs
}

/// Builds one RGBA layer per entry and serializes the image.
///
/// The channel closure type differs per sample type, so the body is
/// instantiated once for `f16` and once for `f32`.
macro_rules! encode_rgba_layers {
    ($sample:ty, $images:expr, $options:expr) => {{
        let mut display = Vec2(0usize, 0usize);
        let mut layers: SmallVec<[_; 2]> = SmallVec::new();
        for (index, entry) in $images.iter().enumerate() {
            let (width, height) = entry.image.dimensions();
            display = Vec2(display.0.max(width), display.1.max(height));

            let pixels: Vec<$sample> = native_pixels(entry, 4, &CAPABILITIES, $options);
            layers.push(Layer::new(
                (width, height),
                layer_attributes(index, entry.attributes),
                Encoding {
                    compression: $options.exr_compression.to_exr(),
                    blocks: Blocks::ScanLines,
                    line_order: LineOrder::Increasing,
                },
                SpecificChannels::rgba(move |pos: Vec2<usize>| {
                    let i = (pos.y() * width + pos.x()) * 4;
                    (pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3])
                }),
            ));
        }

        let image = ::exr::image::Image::from_layers(
            ::exr::meta::header::ImageAttributes::new(IntegerBounds::from_dimensions(display)),
            layers,
        );

        let mut bytes = Vec::new();
        image
            .write()
            .non_parallel()
            .to_buffered(Cursor::new(&mut bytes))
            .map_err(exr_encode_err)?;
        bytes
    }};
}

/// OpenEXR backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExrCodec;

impl ImageCodec for ExrCodec {
    fn format(&self) -> Format {
        Format::Exr
    }

    fn capabilities(&self) -> &'static CodecCapabilities {
        &CAPABILITIES
    }

    fn encode(&self, images: &[EncodeEntry<'_>], options: &WriteOptions) -> IoResult<Vec<u8>> {
        if images.is_empty() {
            return Err(IoError::MissingData("no image to write".into()));
        }
        let format = CAPABILITIES.output_format(options.output_format)?;
        for entry in images {
            check_layout(entry.image)?;
            warn_unstored(entry.attributes, &[COMMENT, AUTHOR], Format::Exr);
        }

        let bytes = match format {
            PixelFormat::Float => encode_rgba_layers!(f32, images, options),
            _ => encode_rgba_layers!(f16, images, options),
        };

        debug!(
            layers = images.len(),
            %format,
            compression = ?options.exr_compression,
            bytes = bytes.len(),
            "encoded EXR"
        );
        Ok(bytes)
    }

    fn decode(&self, data: &[u8], options: &ReadOptions) -> IoResult<DecodedImage> {
        let exr_image = ::exr::image::read::read()
            .no_deep_data()
            .largest_resolution_level()
            .all_channels()
            .first_valid_layer()
            .all_attributes()
            .non_parallel()
            .from_buffered(Cursor::new(data))
            .map_err(exr_decode_err)?;

        let layer = &exr_image.layer_data;
        let width = layer.size.width();
        let height = layer.size.height();

        let names: Vec<String> = layer
            .channel_data
            .list
            .iter()
            .map(|c| c.name.to_string())
            .collect();
        let sources = select_rgba(&names)?;
        let samples: Vec<&FlatSamples> = sources
            .iter()
            .map(|&i| &layer.channel_data.list[i].sample_data)
            .collect();
        let channels = samples.len();
        let (tw, th) = (options.tile_width, options.tile_height);

        let image = match samples[0] {
            FlatSamples::F16(_) => {
                let data: Vec<f16> = interleave(&samples, width * height);
                Image::from_interleaved(width, height, tw, th, channels, &data)?
            }
            FlatSamples::F32(_) => {
                let data: Vec<f32> = interleave(&samples, width * height);
                Image::from_interleaved(width, height, tw, th, channels, &data)?
            }
            FlatSamples::U32(_) => {
                let data: Vec<u32> = interleave(&samples, width * height);
                Image::from_interleaved(width, height, tw, th, channels, &data)?
            }
        };

        let mut attributes = decoded_attributes(ColorEncoding::Linear);
        let header = &layer.attributes;
        for (key, value) in [
            (SOFTWARE, &header.software_name),
            (COMMENT, &header.comments),
            (AUTHOR, &header.owner),
        ] {
            if let Some(text) = value {
                attributes.insert(key, text.to_string());
            }
        }

        Ok(DecodedImage { image, attributes })
    }
}

/// Picks the channel indices feeding R, G, B and optionally A.
///
/// Names match on their last `.`-separated component. A lone `Y` channel
/// feeds all three color channels.
fn select_rgba(names: &[String]) -> IoResult<Vec<usize>> {
    let find = |wanted: &str| {
        names
            .iter()
            .position(|n| n.rsplit('.').next().is_some_and(|base| base == wanted))
    };

    let alpha = find("A");
    let color = match (find("R"), find("G"), find("B"), find("Y")) {
        (Some(r), Some(g), Some(b), _) => [r, g, b],
        (_, _, _, Some(y)) => [y, y, y],
        _ => {
            return Err(IoError::UnsupportedPixelLayout(format!(
                "no RGB or Y channels in EXR layer (found {names:?})"
            )));
        }
    };

    let mut out = color.to_vec();
    out.extend(alpha);
    Ok(out)
}

/// Interleaves planar channels, converting each sample to `T`.
fn interleave<T: Component>(channels: &[&FlatSamples], pixel_count: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(pixel_count * channels.len());
    for i in 0..pixel_count {
        for samples in channels {
            let sample = match samples {
                FlatSamples::F16(v) => v[i].to_sample(),
                FlatSamples::F32(v) => v[i].to_sample(),
                FlatSamples::U32(v) => v[i].to_sample(),
            };
            out.push(T::from_sample(sample));
        }
    }
    out
}
