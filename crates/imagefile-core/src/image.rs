//! Tiled image container.
//!
//! An [`Image`] owns a `width x height` grid of pixels with a fixed channel
//! count and [`PixelFormat`]. Storage is split into tiles of
//! `tile_width x tile_height` pixels; the image dimensions need not be a
//! multiple of the tile size, so tiles on the right and bottom edges are
//! clipped to the image.
//!
//! # Memory Layout
//!
//! Each [`Tile`] stores its pixels row-major and channel-interleaved, in
//! native byte order:
//!
//! ```text
//! Tile (0,0)           Tile (1,0)
//! [RGBA RGBA ...]      [RGBA ...]     <- row 0 of the tile
//! [RGBA RGBA ...]      [RGBA ...]     <- row 1 of the tile
//! ```
//!
//! # Conversion on access
//!
//! [`Image::get_pixel`] and [`Image::set_pixel`] take any [`Color<T, N>`]
//! and convert between it and the stored format through
//! [`crate::convert`]:
//!
//! ```rust
//! use imagefile_core::{Color3b, Color4b, Image, PixelFormat};
//!
//! let mut img = Image::new(16, 16, 8, 8, 3, PixelFormat::UInt16).unwrap();
//! img.clear(Color3b::new(50, 100, 150));
//!
//! // 3-channel storage read as RGBA gets opaque alpha
//! let px: Color4b = img.get_pixel(15, 15);
//! assert_eq!(px, Color4b::new(50, 100, 150, 255));
//! ```

use crate::color::{Color, Component};
use crate::convert::{missing_channel, read_sample, write_sample};
use crate::{Error, PixelFormat, Result};

/// Largest supported channel count.
pub const MAX_CHANNELS: usize = 4;

/// Layout of an [`Image`]: dimensions, tiling and pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageProperties {
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// Tile width in pixels.
    pub tile_width: usize,
    /// Tile height in pixels.
    pub tile_height: usize,
    /// Number of tiles horizontally.
    pub tiles_x: usize,
    /// Number of tiles vertically.
    pub tiles_y: usize,
    /// Channels per pixel.
    pub channel_count: usize,
    /// Storage format of each channel.
    pub pixel_format: PixelFormat,
    /// Bytes per pixel.
    pub pixel_size: usize,
}

impl ImageProperties {
    /// Validates and computes the layout.
    ///
    /// Fails if any dimension is zero, the channel count is outside
    /// `1..=4`, or the total byte size overflows.
    pub fn new(
        width: usize,
        height: usize,
        tile_width: usize,
        tile_height: usize,
        channel_count: usize,
        pixel_format: PixelFormat,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_dimensions(width, height, "image is empty"));
        }
        if tile_width == 0 || tile_height == 0 {
            return Err(Error::invalid_dimensions(
                tile_width,
                tile_height,
                "tile is empty",
            ));
        }
        if channel_count == 0 || channel_count > MAX_CHANNELS {
            return Err(Error::UnsupportedChannelCount(channel_count));
        }

        let pixel_size = channel_count * pixel_format.size();
        width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(pixel_size))
            .ok_or_else(|| Error::invalid_dimensions(width, height, "size overflows"))?;

        Ok(Self {
            width,
            height,
            tile_width,
            tile_height,
            tiles_x: width.div_ceil(tile_width),
            tiles_y: height.div_ceil(tile_height),
            channel_count,
            pixel_format,
            pixel_size,
        })
    }

    /// Total number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Total number of tiles.
    #[inline]
    pub fn tile_count(&self) -> usize {
        self.tiles_x * self.tiles_y
    }

    /// Actual size of tile `(tx, ty)`, clipped at the image edges.
    #[inline]
    pub fn tile_extent(&self, tx: usize, ty: usize) -> (usize, usize) {
        let w = (self.width - tx * self.tile_width).min(self.tile_width);
        let h = (self.height - ty * self.tile_height).min(self.tile_height);
        (w, h)
    }
}

/// One rectangular block of pixel storage.
#[derive(Clone, PartialEq)]
pub struct Tile {
    width: usize,
    height: usize,
    pixel_size: usize,
    data: Vec<u8>,
}

impl Tile {
    fn new(width: usize, height: usize, pixel_size: usize) -> Self {
        Self {
            width,
            height,
            pixel_size,
            data: vec![0; width * height * pixel_size],
        }
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw bytes, row-major, native byte order.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        (y * self.width + x) * self.pixel_size
    }

    #[inline]
    fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let off = self.offset(x, y);
        &self.data[off..off + self.pixel_size]
    }

    #[inline]
    fn pixel_mut(&mut self, x: usize, y: usize) -> &mut [u8] {
        let off = self.offset(x, y);
        &mut self.data[off..off + self.pixel_size]
    }
}

impl std::fmt::Debug for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tile")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Owned, tiled image.
#[derive(Clone, PartialEq)]
pub struct Image {
    props: ImageProperties,
    tiles: Vec<Tile>,
}

impl Image {
    /// Creates a zero-initialized image.
    ///
    /// # Example
    ///
    /// ```rust
    /// use imagefile_core::{Image, PixelFormat};
    ///
    /// // 100x50 with 32x32 tiles: 4x2 tiles, the last column 4 pixels wide
    /// let img = Image::new(100, 50, 32, 32, 4, PixelFormat::Half).unwrap();
    /// assert_eq!(img.properties().tile_count(), 8);
    /// assert_eq!(img.tile(3, 1).width(), 4);
    /// assert_eq!(img.tile(3, 1).height(), 18);
    /// ```
    pub fn new(
        width: usize,
        height: usize,
        tile_width: usize,
        tile_height: usize,
        channel_count: usize,
        pixel_format: PixelFormat,
    ) -> Result<Self> {
        let props = ImageProperties::new(
            width,
            height,
            tile_width,
            tile_height,
            channel_count,
            pixel_format,
        )?;

        let mut tiles = Vec::with_capacity(props.tile_count());
        for ty in 0..props.tiles_y {
            for tx in 0..props.tiles_x {
                let (w, h) = props.tile_extent(tx, ty);
                tiles.push(Tile::new(w, h, props.pixel_size));
            }
        }

        Ok(Self { props, tiles })
    }

    /// Creates an image from a channel-interleaved, row-major buffer.
    ///
    /// The stored format is `T::FORMAT`. `data` must hold exactly
    /// `width * height * channel_count` values.
    pub fn from_interleaved<T: Component>(
        width: usize,
        height: usize,
        tile_width: usize,
        tile_height: usize,
        channel_count: usize,
        data: &[T],
    ) -> Result<Self> {
        let mut image = Self::new(
            width,
            height,
            tile_width,
            tile_height,
            channel_count,
            T::FORMAT,
        )?;

        let expected = width * height * channel_count;
        if data.len() != expected {
            return Err(Error::buffer_size_mismatch(expected, data.len()));
        }

        let size = T::FORMAT.size();
        for (i, px) in data.chunks_exact(channel_count).enumerate() {
            let out = image.pixel_bytes_mut(i % width, i / width);
            for (c, v) in px.iter().enumerate() {
                write_sample(T::FORMAT, v.to_sample(), &mut out[c * size..]);
            }
        }

        Ok(image)
    }

    /// Layout of this image.
    #[inline]
    pub fn properties(&self) -> &ImageProperties {
        &self.props
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.props.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.props.height
    }

    /// `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.props.width, self.props.height)
    }

    /// Channels per pixel.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.props.channel_count
    }

    /// Storage format.
    #[inline]
    pub fn pixel_format(&self) -> PixelFormat {
        self.props.pixel_format
    }

    /// Tile at grid position `(tx, ty)`.
    ///
    /// # Panics
    ///
    /// Panics if the tile coordinates are outside the tile grid.
    #[inline]
    pub fn tile(&self, tx: usize, ty: usize) -> &Tile {
        assert!(tx < self.props.tiles_x && ty < self.props.tiles_y, "tile out of bounds");
        &self.tiles[ty * self.props.tiles_x + tx]
    }

    #[inline]
    fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.props.width && y < self.props.height
    }

    #[inline]
    fn check_bounds(&self, x: usize, y: usize) -> Result<()> {
        if self.in_bounds(x, y) {
            Ok(())
        } else {
            Err(Error::out_of_bounds(x, y, self.props.width, self.props.height))
        }
    }

    /// Tile index and in-tile coordinates of pixel `(x, y)`.
    #[inline]
    fn locate(&self, x: usize, y: usize) -> (usize, usize, usize) {
        let p = &self.props;
        let tx = x / p.tile_width;
        let ty = y / p.tile_height;
        (ty * p.tiles_x + tx, x % p.tile_width, y % p.tile_height)
    }

    #[inline]
    fn pixel_bytes(&self, x: usize, y: usize) -> &[u8] {
        let (t, px, py) = self.locate(x, y);
        self.tiles[t].pixel(px, py)
    }

    #[inline]
    fn pixel_bytes_mut(&mut self, x: usize, y: usize) -> &mut [u8] {
        let (t, px, py) = self.locate(x, y);
        self.tiles[t].pixel_mut(px, py)
    }

    /// Decodes stored pixel bytes into a color.
    fn decode_pixel<T: Component, const N: usize>(&self, bytes: &[u8]) -> Color<T, N> {
        let fmt = self.props.pixel_format;
        let size = fmt.size();
        let channels = self.props.channel_count;
        Color(std::array::from_fn(|c| {
            let sample = if c < channels {
                read_sample(fmt, &bytes[c * size..])
            } else {
                missing_channel(c)
            };
            T::from_sample(sample)
        }))
    }

    /// Encodes a color into stored pixel bytes.
    fn encode_pixel<T: Component, const N: usize>(&self, color: &Color<T, N>, out: &mut [u8]) {
        let fmt = self.props.pixel_format;
        let size = fmt.size();
        for c in 0..self.props.channel_count {
            let sample = if c < N {
                color.0[c].to_sample()
            } else {
                missing_channel(c)
            };
            write_sample(fmt, sample, &mut out[c * size..]);
        }
    }

    /// Reads pixel `(x, y)`, converted to `Color<T, N>`.
    ///
    /// Channels map by index. If the image has fewer channels than `N`, a
    /// missing alpha channel reads as opaque and any other missing channel
    /// reads as zero; surplus image channels are ignored.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds. Use
    /// [`try_get_pixel`](Self::try_get_pixel) for a checked variant.
    #[inline]
    pub fn get_pixel<T: Component, const N: usize>(&self, x: usize, y: usize) -> Color<T, N> {
        assert!(self.in_bounds(x, y), "pixel ({x}, {y}) out of bounds");
        self.decode_pixel(self.pixel_bytes(x, y))
    }

    /// Reads pixel `(x, y)`, or fails with [`Error::OutOfBounds`].
    pub fn try_get_pixel<T: Component, const N: usize>(
        &self,
        x: usize,
        y: usize,
    ) -> Result<Color<T, N>> {
        self.check_bounds(x, y)?;
        Ok(self.decode_pixel(self.pixel_bytes(x, y)))
    }

    /// Writes pixel `(x, y)`, converting from `Color<T, N>`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds. Use
    /// [`try_set_pixel`](Self::try_set_pixel) for a checked variant.
    #[inline]
    pub fn set_pixel<T: Component, const N: usize>(&mut self, x: usize, y: usize, color: Color<T, N>) {
        assert!(self.in_bounds(x, y), "pixel ({x}, {y}) out of bounds");
        let mut buf = [0u8; MAX_CHANNELS * 4];
        let size = self.props.pixel_size;
        self.encode_pixel(&color, &mut buf[..size]);
        self.pixel_bytes_mut(x, y).copy_from_slice(&buf[..size]);
    }

    /// Writes pixel `(x, y)`, or fails with [`Error::OutOfBounds`].
    pub fn try_set_pixel<T: Component, const N: usize>(
        &mut self,
        x: usize,
        y: usize,
        color: Color<T, N>,
    ) -> Result<()> {
        self.check_bounds(x, y)?;
        self.set_pixel(x, y, color);
        Ok(())
    }

    /// Sets every pixel to `color`.
    ///
    /// The color is converted once, then copied into every tile.
    pub fn clear<T: Component, const N: usize>(&mut self, color: Color<T, N>) {
        let mut buf = [0u8; MAX_CHANNELS * 4];
        let size = self.props.pixel_size;
        self.encode_pixel(&color, &mut buf[..size]);
        let pixel = &buf[..size];
        for tile in &mut self.tiles {
            for chunk in tile.data.chunks_exact_mut(size) {
                chunk.copy_from_slice(pixel);
            }
        }
    }

    /// Copies the image into a row-major interleaved buffer of `T`.
    ///
    /// Channels are reconciled to `channels` with the same rules as
    /// [`get_pixel`](Self::get_pixel).
    pub fn to_interleaved<T: Component>(&self, channels: usize) -> Vec<T> {
        let fmt = self.props.pixel_format;
        let size = fmt.size();
        let src_channels = self.props.channel_count;
        let mut out = Vec::with_capacity(self.props.pixel_count() * channels);

        for y in 0..self.props.height {
            for x in 0..self.props.width {
                let bytes = self.pixel_bytes(x, y);
                for c in 0..channels {
                    let sample = if c < src_channels {
                        read_sample(fmt, &bytes[c * size..])
                    } else {
                        missing_channel(c)
                    };
                    out.push(T::from_sample(sample));
                }
            }
        }

        out
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.props.width)
            .field("height", &self.props.height)
            .field("channels", &self.props.channel_count)
            .field("format", &self.props.pixel_format)
            .field("tiles", &(self.props.tiles_x, self.props.tiles_y))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color3b, Color3f, Color4b, Color4f};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_new_zeroed() {
        let img = Image::new(5, 3, 2, 2, 3, PixelFormat::Float).unwrap();
        assert_eq!(img.dimensions(), (5, 3));
        let px: Color3f = img.get_pixel(4, 2);
        assert_eq!(px, Color3f::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_invalid_layouts() {
        assert!(matches!(
            Image::new(0, 4, 4, 4, 3, PixelFormat::UInt8),
            Err(Error::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Image::new(4, 4, 0, 4, 3, PixelFormat::UInt8),
            Err(Error::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Image::new(4, 4, 4, 4, 5, PixelFormat::UInt8),
            Err(Error::UnsupportedChannelCount(5))
        ));
        assert!(matches!(
            Image::new(4, 4, 4, 4, 0, PixelFormat::UInt8),
            Err(Error::UnsupportedChannelCount(0))
        ));
    }

    #[test]
    fn test_boundary_tiles_clipped() {
        let img = Image::new(10, 7, 4, 4, 1, PixelFormat::UInt8).unwrap();
        let p = img.properties();
        assert_eq!((p.tiles_x, p.tiles_y), (3, 2));
        assert_eq!(img.tile(2, 1).width(), 2);
        assert_eq!(img.tile(2, 1).height(), 3);
        assert_eq!(img.tile(2, 1).data().len(), 6);
    }

    #[test]
    fn test_set_get_across_tiles() {
        let mut img = Image::new(9, 9, 4, 4, 4, PixelFormat::UInt8).unwrap();
        for y in 0..9 {
            for x in 0..9 {
                img.set_pixel(x, y, Color4b::new(x as u8, y as u8, 7, 200));
            }
        }
        for y in 0..9 {
            for x in 0..9 {
                let px: Color4b = img.get_pixel(x, y);
                assert_eq!(px, Color4b::new(x as u8, y as u8, 7, 200));
            }
        }
    }

    #[test]
    fn test_clear_matches_set_pixel() {
        let color = Color4f::new(0.6, 0.7, 0.8, 0.5);

        let mut a = Image::new(6, 5, 4, 4, 4, PixelFormat::UInt16).unwrap();
        a.clear(color);

        let mut b = Image::new(6, 5, 4, 4, 4, PixelFormat::UInt16).unwrap();
        for y in 0..5 {
            for x in 0..6 {
                b.set_pixel(x, y, color);
            }
        }
        assert_eq!(a, b);
    }

    #[test]
    fn test_uint16_storage_reads_as_u8() {
        let mut img = Image::new(2, 2, 2, 2, 3, PixelFormat::UInt16).unwrap();
        img.clear(Color3b::new(50, 100, 150));
        let px: Color3b = img.get_pixel(1, 1);
        assert_eq!(px, Color3b::new(50, 100, 150));
    }

    #[test]
    fn test_channel_padding() {
        let mut img = Image::new(1, 1, 1, 1, 3, PixelFormat::Float).unwrap();
        img.clear(Color4f::new(0.1, 0.2, 0.3, 0.4));
        let px: Color4f = img.get_pixel(0, 0);
        assert_abs_diff_eq!(px.b(), 0.3);
        assert_eq!(px.a(), 1.0);

        let mut img = Image::new(1, 1, 1, 1, 4, PixelFormat::UInt8).unwrap();
        img.set_pixel(0, 0, Color3b::new(1, 2, 3));
        let px: Color4b = img.get_pixel(0, 0);
        assert_eq!(px, Color4b::new(1, 2, 3, 255));
    }

    #[test]
    fn test_try_accessors_bounds() {
        let mut img = Image::new(4, 4, 2, 2, 3, PixelFormat::UInt8).unwrap();
        let err = img.try_get_pixel::<u8, 3>(4, 0).unwrap_err();
        assert!(err.is_bounds_error());
        assert!(img.try_set_pixel(0, 4, Color3b::new(1, 1, 1)).is_err());
        assert!(img.try_set_pixel(3, 3, Color3b::new(1, 1, 1)).is_ok());
    }

    #[test]
    #[should_panic]
    fn test_get_pixel_out_of_bounds_panics() {
        let img = Image::new(4, 4, 2, 2, 3, PixelFormat::UInt8).unwrap();
        let _: Color3b = img.get_pixel(0, 4);
    }

    #[test]
    fn test_interleaved_roundtrip() {
        let data: Vec<u8> = (0..5 * 3 * 4).map(|v| v as u8).collect();
        let img = Image::from_interleaved(5, 3, 2, 2, 4, &data).unwrap();
        assert_eq!(img.pixel_format(), PixelFormat::UInt8);
        assert_eq!(img.to_interleaved::<u8>(4), data);

        let px: Color4b = img.get_pixel(1, 2);
        assert_eq!(px, Color4b::new(44, 45, 46, 47));
    }

    #[test]
    fn test_to_interleaved_reconciles_channels() {
        let mut img = Image::new(2, 1, 2, 2, 4, PixelFormat::UInt8).unwrap();
        img.clear(Color4b::new(10, 20, 30, 40));
        assert_eq!(img.to_interleaved::<u8>(3), vec![10, 20, 30, 10, 20, 30]);

        let mut img = Image::new(1, 1, 2, 2, 3, PixelFormat::UInt8).unwrap();
        img.clear(Color3b::new(10, 20, 30));
        assert_eq!(img.to_interleaved::<u16>(4), vec![2570, 5140, 7710, 65535]);
    }

    #[test]
    fn test_from_interleaved_size_mismatch() {
        let err = Image::from_interleaved(2, 2, 2, 2, 3, &[0u8; 11]).unwrap_err();
        assert!(matches!(err, Error::BufferSizeMismatch { expected: 12, got: 11 }));
    }
}
