//! Radiance HDR (RGBE) format support.
//!
//! Stores three linear float channels as shared-exponent RGBE bytes, with
//! the standard per-channel RLE scanline encoding when the width allows.
//! `SOFTWARE`, `GAMMA` and `EXPOSURE` header lines map to the
//! `software`, `gamma` and `exposure` attributes.

use crate::traits::{
    CodecCapabilities, DecodedImage, EncodeEntry, ImageCodec, check_layout, decoded_attributes,
    native_pixels, single_image, truncated, warn_unstored,
};
use crate::{Format, IoError, IoResult, ReadOptions, WriteOptions};
use imagefile_core::attributes::{COLOR_SPACE, EXPOSURE, GAMMA, SOFTWARE};
use imagefile_core::{ColorEncoding, Image, ImageAttributes, PixelFormat};
use std::io::{BufRead, Cursor, Read, Write};
use tracing::debug;

const HDR_MAGIC: &str = "#?";
const FORMAT_RGBE: &str = "32-bit_rle_rgbe";

/// Scanline RLE is only defined for widths in this range.
const RLE_MIN_WIDTH: usize = 8;
const RLE_MAX_WIDTH: usize = 0x7fff;

static CAPABILITIES: CodecCapabilities = CodecCapabilities {
    native_channels: 3,
    native_format: PixelFormat::Float,
    native_encoding: ColorEncoding::Linear,
    supports_alpha: false,
    multi_image: false,
    lossy: false,
    output_formats: &[PixelFormat::Float],
};

/// Radiance HDR backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct HdrCodec;

impl ImageCodec for HdrCodec {
    fn format(&self) -> Format {
        Format::Hdr
    }

    fn capabilities(&self) -> &'static CodecCapabilities {
        &CAPABILITIES
    }

    fn encode(&self, images: &[EncodeEntry<'_>], options: &WriteOptions) -> IoResult<Vec<u8>> {
        let entry = single_image(images, Format::Hdr)?;
        check_layout(entry.image)?;
        CAPABILITIES.output_format(options.output_format)?;
        warn_unstored(entry.attributes, &[GAMMA, EXPOSURE], Format::Hdr);

        let (width, height) = entry.image.dimensions();
        let pixels: Vec<f32> = native_pixels(entry, 3, &CAPABILITIES, options);

        let mut out = Vec::with_capacity(width * height * 4 + 128);
        write_header(&mut out, entry.attributes, width, height)?;
        write_pixels(&mut out, &pixels, width, height)?;
        debug!(width, height, bytes = out.len(), "encoded HDR");
        Ok(out)
    }

    fn decode(&self, data: &[u8], options: &ReadOptions) -> IoResult<DecodedImage> {
        decode_rgbe(data, options).map_err(truncated(Format::Hdr))
    }
}

fn decode_rgbe(data: &[u8], options: &ReadOptions) -> IoResult<DecodedImage> {
    let mut reader = Cursor::new(data);
    let header = read_header(&mut reader)?;
    let (width, height) = (header.width, header.height);

    let available = data.len().saturating_sub(reader.position() as usize);
    let mut pixels = read_pixels(&mut reader, width, height, available)?;
    if header.bottom_up {
        flip_rows(&mut pixels, width * 3);
    }

    let image = Image::from_interleaved(
        width,
        height,
        options.tile_width,
        options.tile_height,
        3,
        &pixels,
    )?;

    let mut attributes = decoded_attributes(ColorEncoding::Linear);
    if header.format.to_ascii_lowercase().contains("xyze") {
        attributes.insert(COLOR_SPACE, "xyz");
    }
    attributes.merge(&header.attributes);

    Ok(DecodedImage { image, attributes })
}

struct Header {
    width: usize,
    height: usize,
    bottom_up: bool,
    format: String,
    attributes: ImageAttributes,
}

fn write_header<W: Write>(
    writer: &mut W,
    attributes: &ImageAttributes,
    width: usize,
    height: usize,
) -> IoResult<()> {
    writeln!(writer, "{HDR_MAGIC}RADIANCE")?;
    writeln!(writer, "FORMAT={FORMAT_RGBE}")?;
    if let Some(v) = attributes.get_str(SOFTWARE) {
        writeln!(writer, "SOFTWARE={}", single_line(v))?;
    }
    if let Some(v) = attributes.get_float(GAMMA) {
        writeln!(writer, "GAMMA={v}")?;
    }
    if let Some(v) = attributes.get_float(EXPOSURE) {
        writeln!(writer, "EXPOSURE={v}")?;
    }
    writeln!(writer)?;
    writeln!(writer, "-Y {height} +X {width}")?;
    Ok(())
}

fn read_header<R: BufRead>(reader: &mut R) -> IoResult<Header> {
    let mut attributes = ImageAttributes::new();
    let mut line = String::new();

    reader.read_line(&mut line)?;
    if !trim_line(&line).starts_with(HDR_MAGIC) {
        return Err(IoError::DecodeError("HDR magic not found".into()));
    }

    let mut format = FORMAT_RGBE.to_string();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(IoError::DecodeError("missing HDR resolution line".into()));
        }
        let line = trim_line(&line);

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('+') || line.starts_with('-') {
            let (width, height, bottom_up) = parse_resolution(line)
                .ok_or_else(|| IoError::DecodeError("invalid HDR resolution line".into()))?;
            return Ok(Header {
                width,
                height,
                bottom_up,
                format,
                attributes,
            });
        }

        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim();
            match key.trim().to_ascii_uppercase().as_str() {
                "FORMAT" => format = value.to_string(),
                "SOFTWARE" => attributes.insert(SOFTWARE, value),
                "GAMMA" => insert_number(&mut attributes, GAMMA, value),
                "EXPOSURE" => insert_number(&mut attributes, EXPOSURE, value),
                other => debug!(key = other, "ignoring HDR header field"),
            }
        }
    }
}

fn insert_number(attributes: &mut ImageAttributes, key: &str, value: &str) {
    match value.parse::<f64>() {
        Ok(v) => attributes.insert(key, v),
        Err(_) => attributes.insert(key, value),
    }
}

/// Parses `-Y h +X w`; `+Y` marks a bottom-up file.
fn parse_resolution(line: &str) -> Option<(usize, usize, bool)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let [a0, v0, a1, v1] = parts.as_slice() else {
        return None;
    };

    let mut width = None;
    let mut height = None;
    let mut bottom_up = false;

    for (axis, value) in [(*a0, *v0), (*a1, *v1)] {
        let value: usize = value.parse().ok()?;
        match axis {
            "-Y" | "+Y" => {
                height = Some(value);
                bottom_up = axis == "+Y";
            }
            "+X" | "-X" => width = Some(value),
            _ => return None,
        }
    }

    match (width, height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h, bottom_up)),
        _ => None,
    }
}

/// Reads `height` scanlines. `available` is the number of input bytes left,
/// used to reject resolutions the data cannot hold before allocating.
fn read_pixels<R: Read>(
    reader: &mut R,
    width: usize,
    height: usize,
    available: usize,
) -> IoResult<Vec<f32>> {
    let len = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| IoError::DecodeError(format!("HDR size {width}x{height} overflows")))?;

    let mut first = [0u8; 4];
    reader.read_exact(&mut first)?;

    let use_rle = (RLE_MIN_WIDTH..=RLE_MAX_WIDTH).contains(&width)
        && first[0] == 2
        && first[1] == 2
        && ((first[2] as usize) << 8 | first[3] as usize) == width;

    // An RLE scanline is at least its 4-byte header plus one 2-byte run of
    // up to 127 pixels per channel.
    let needed = if use_rle {
        height.checked_mul(4 + 8 * width.div_ceil(127))
    } else {
        Some(len)
    };
    if needed.is_none_or(|n| n > available) {
        return Err(IoError::DecodeError(format!(
            "HDR {width}x{height} needs more than the {available} bytes present"
        )));
    }

    let mut rgbe = vec![0u8; len];

    if use_rle {
        let mut header = first;
        for (y, row) in rgbe.chunks_exact_mut(width * 4).enumerate() {
            if y > 0 {
                reader.read_exact(&mut header)?;
            }
            decode_rle_scanline(reader, width, row, header)?;
        }
    } else {
        rgbe[0..4].copy_from_slice(&first);
        reader.read_exact(&mut rgbe[4..])?;
    }

    let mut data = Vec::with_capacity(width * height * 3);
    for chunk in rgbe.chunks_exact(4) {
        data.extend_from_slice(&rgbe_to_f32([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(data)
}

fn decode_rle_scanline<R: Read>(
    reader: &mut R,
    width: usize,
    out: &mut [u8],
    header: [u8; 4],
) -> IoResult<()> {
    if header[0] != 2 || header[1] != 2 {
        return Err(IoError::DecodeError("HDR RLE header invalid".into()));
    }
    let encoded_width = ((header[2] as usize) << 8) | (header[3] as usize);
    if encoded_width != width {
        return Err(IoError::DecodeError("HDR RLE width mismatch".into()));
    }

    let mut channel = vec![0u8; width];
    for c in 0..4 {
        let mut idx = 0usize;
        while idx < width {
            let mut count = [0u8; 1];
            reader.read_exact(&mut count)?;
            let count = count[0] as usize;
            let run = if count > 128 { count - 128 } else { count };
            if run == 0 || idx + run > width {
                return Err(IoError::DecodeError("HDR RLE run overflows scanline".into()));
            }

            if count > 128 {
                let mut value = [0u8; 1];
                reader.read_exact(&mut value)?;
                channel[idx..idx + run].fill(value[0]);
            } else {
                reader.read_exact(&mut channel[idx..idx + run])?;
            }
            idx += run;
        }

        for (x, v) in channel.iter().enumerate() {
            out[x * 4 + c] = *v;
        }
    }

    Ok(())
}

fn write_pixels<W: Write>(writer: &mut W, pixels: &[f32], width: usize, height: usize) -> IoResult<()> {
    let use_rle = (RLE_MIN_WIDTH..=RLE_MAX_WIDTH).contains(&width);

    let mut scanline = vec![0u8; width * 4];
    for row in pixels.chunks_exact(width * 3).take(height) {
        for (px, out) in row.chunks_exact(3).zip(scanline.chunks_exact_mut(4)) {
            out.copy_from_slice(&f32_to_rgbe(px[0], px[1], px[2]));
        }

        if use_rle {
            let header = [2u8, 2u8, (width >> 8) as u8, (width & 0xFF) as u8];
            writer.write_all(&header)?;
            encode_rle_scanline(writer, width, &scanline)?;
        } else {
            writer.write_all(&scanline)?;
        }
    }

    Ok(())
}

fn encode_rle_scanline<W: Write>(writer: &mut W, width: usize, scanline: &[u8]) -> IoResult<()> {
    let mut channel = vec![0u8; width];
    for c in 0..4 {
        for (x, v) in channel.iter_mut().enumerate() {
            *v = scanline[x * 4 + c];
        }
        writer.write_all(&encode_rle_channel(&channel))?;
    }
    Ok(())
}

/// Runs of 4 or more repeat bytes become `128 + n, value`; everything else
/// is stored as literals of at most 128 bytes.
fn encode_rle_channel(data: &[u8]) -> Vec<u8> {
    let run_at = |i: usize| {
        let mut run = 1usize;
        while i + run < data.len() && run < 127 && data[i] == data[i + run] {
            run += 1;
        }
        run
    };

    let mut out = Vec::with_capacity(data.len() * 2);
    let mut i = 0usize;
    while i < data.len() {
        let run = run_at(i);
        if run >= 4 {
            out.push((128 + run) as u8);
            out.push(data[i]);
            i += run;
            continue;
        }

        let start = i;
        while i < data.len() && i - start < 128 && run_at(i) < 4 {
            i += 1;
        }
        out.push((i - start) as u8);
        out.extend_from_slice(&data[start..i]);
    }
    out
}

fn f32_to_rgbe(r: f32, g: f32, b: f32) -> [u8; 4] {
    let r = r.max(0.0);
    let g = g.max(0.0);
    let b = b.max(0.0);
    let max = r.max(g).max(b);
    if !max.is_finite() || max < 1.0e-32 {
        return [0, 0, 0, 0];
    }

    let (m, e) = frexp(max);
    if e > 127 {
        return [255, 255, 255, 255];
    }
    let scale = m * 256.0 / max;

    [
        (r * scale).clamp(0.0, 255.0) as u8,
        (g * scale).clamp(0.0, 255.0) as u8,
        (b * scale).clamp(0.0, 255.0) as u8,
        (e + 128) as u8,
    ]
}

/// Non-zero mantissas are read from the center of their quantization
/// bucket; a zero mantissa stays zero.
fn rgbe_to_f32(rgbe: [u8; 4]) -> [f32; 3] {
    let [r, g, b, e] = rgbe;
    if e == 0 {
        return [0.0; 3];
    }
    let f = 2.0_f32.powi(e as i32 - 136);
    let channel = |m: u8| if m == 0 { 0.0 } else { (m as f32 + 0.5) * f };
    [channel(r), channel(g), channel(b)]
}

/// Splits `x` into a mantissa in `[0.5, 1)` and a power of two.
fn frexp(x: f32) -> (f32, i32) {
    if x == 0.0 {
        return (0.0, 0);
    }
    let mut e = x.abs().log2().floor() as i32 + 1;
    let mut m = x / 2.0_f32.powi(e);
    if m.abs() >= 1.0 {
        m /= 2.0;
        e += 1;
    } else if m.abs() < 0.5 {
        m *= 2.0;
        e -= 1;
    }
    (m, e)
}

fn flip_rows(data: &mut [f32], row_len: usize) {
    let rows = data.len() / row_len;
    for y in 0..rows / 2 {
        let (top, bottom) = data.split_at_mut((rows - 1 - y) * row_len);
        top[y * row_len..(y + 1) * row_len].swap_with_slice(&mut bottom[..row_len]);
    }
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn trim_line(line: &str) -> &str {
    line.trim_end_matches(&['\r', '\n'][..])
}
