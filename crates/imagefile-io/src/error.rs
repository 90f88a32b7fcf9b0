//! Error types for I/O operations.
//!
//! Provides unified error handling for every codec backend and for the
//! generic reader and writer.
//!
//! | Failure                                   | Variant                          |
//! |-------------------------------------------|----------------------------------|
//! | extension/content matches no backend      | [`IoError::UnsupportedFormat`]   |
//! | channel count/bit depth has no mapping    | [`IoError::UnsupportedPixelLayout`] |
//! | file create/open/read/write failed        | [`IoError::Io`]                  |
//! | corrupt, truncated or invalid bitstream   | [`IoError::DecodeError`]         |

use std::io;
use thiserror::Error;

/// I/O operation error.
#[derive(Debug, Error)]
pub enum IoError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No backend handles this extension or content.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The image layout cannot be mapped onto the target backend.
    #[error("unsupported pixel layout: {0}")]
    UnsupportedPixelLayout(String),

    /// Decoding error.
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Encoding error.
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Unsupported operation.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Missing required data.
    #[error("missing data: {0}")]
    MissingData(String),

    /// Error from the in-memory image model.
    #[error(transparent)]
    Core(#[from] imagefile_core::Error),
}

impl IoError {
    /// Returns `true` for [`IoError::UnsupportedFormat`].
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, Self::UnsupportedFormat(_))
    }

    /// Returns `true` for [`IoError::DecodeError`].
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::DecodeError(_))
    }
}

/// Result type for I/O operations.
pub type IoResult<T> = Result<T, IoError>;
