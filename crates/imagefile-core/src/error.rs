//! Error types for imagefile-core operations.
//!
//! # Overview
//!
//! The [`Error`] enum covers the failure modes of the in-memory image model:
//! - Pixel addressing (bounds checking)
//! - Image construction (dimensions, tile sizes, channel counts)
//! - Bulk buffer import (length mismatches)
//!
//! # Usage
//!
//! ```rust
//! use imagefile_core::{Error, Result};
//!
//! fn check_pixel(x: usize, y: usize, width: usize, height: usize) -> Result<()> {
//!     if x >= width || y >= height {
//!         return Err(Error::out_of_bounds(x, y, width, height));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Used By
//!
//! - [`crate::image::Image`] - construction and checked pixel access
//! - `imagefile-io` - wrapped into its own error type

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the in-memory image model.
#[derive(Debug, Error)]
pub enum Error {
    /// Pixel coordinates are outside image bounds.
    ///
    /// Returned by the checked accessors when `x >= width` or `y >= height`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use imagefile_core::Error;
    ///
    /// let err = Error::out_of_bounds(100, 50, 80, 60);
    /// assert!(err.to_string().contains("100"));
    /// ```
    #[error("pixel ({x}, {y}) out of bounds for image {width}x{height}")]
    OutOfBounds {
        /// X coordinate that was out of bounds
        x: usize,
        /// Y coordinate that was out of bounds
        y: usize,
        /// Image width
        width: usize,
        /// Image height
        height: usize,
    },

    /// Invalid image or tile dimensions.
    ///
    /// Returned when a width, height or tile size is zero, or when the
    /// buffer size would overflow.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Requested width
        width: usize,
        /// Requested height
        height: usize,
        /// Why the dimensions were rejected
        reason: String,
    },

    /// Channel count outside the supported 1..=4 range.
    #[error("unsupported channel count: {0}")]
    UnsupportedChannelCount(usize),

    /// A raw buffer does not hold exactly `width * height * channels` samples.
    #[error("buffer size mismatch: expected {expected} samples, got {got}")]
    BufferSizeMismatch {
        /// Expected sample count
        expected: usize,
        /// Actual sample count
        got: usize,
    },
}

impl Error {
    /// Creates an [`Error::OutOfBounds`] error.
    #[inline]
    pub fn out_of_bounds(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self::OutOfBounds {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(width: usize, height: usize, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::BufferSizeMismatch`] error.
    #[inline]
    pub fn buffer_size_mismatch(expected: usize, got: usize) -> Self {
        Self::BufferSizeMismatch { expected, got }
    }

    /// Returns `true` if this is a bounds-related error.
    #[inline]
    pub fn is_bounds_error(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds() {
        let err = Error::out_of_bounds(100, 50, 80, 60);
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
        assert!(msg.contains("80x60"));
        assert!(err.is_bounds_error());
    }

    #[test]
    fn test_invalid_dimensions() {
        let err = Error::invalid_dimensions(0, 16, "width is zero");
        assert!(err.to_string().contains("width is zero"));
        assert!(!err.is_bounds_error());
    }

    #[test]
    fn test_buffer_size_mismatch() {
        let err = Error::buffer_size_mismatch(12, 9);
        let msg = err.to_string();
        assert!(msg.contains("12"));
        assert!(msg.contains("9"));
    }
}
