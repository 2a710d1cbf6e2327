//! Error types for OxiSeis operations.
//!
//! Codec functions never panic on bad input. Every failure is reported through
//! [`OxiSeisError`], whose variants follow the four failure classes of the
//! codec: parameter errors caught at configuration time, destination buffers
//! that are too small, corrupted or foreign input, and index errors on typed
//! buffer views.

use std::io;
use thiserror::Error;

/// The main error type for OxiSeis operations.
#[derive(Debug, Error)]
pub enum OxiSeisError {
    /// I/O error from an underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A configuration parameter is out of its valid range.
    #[error("Invalid parameter `{name}`: {message}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Description of the constraint that was violated.
        message: String,
    },

    /// Destination buffer is too small for the encoded or decoded data.
    #[error("Buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Number of bytes (or elements) needed.
        needed: usize,
        /// Number of bytes (or elements) available.
        available: usize,
    },

    /// Unknown magic cookie at the start of a compressed buffer.
    #[error("Invalid cookie: found {found:#x}")]
    InvalidCookie {
        /// Cookie value actually found.
        found: i32,
    },

    /// Corrupted data in a compressed stream.
    #[error("Corrupted data at offset {offset}: {message}")]
    Corrupted {
        /// Byte offset where corruption was detected.
        offset: usize,
        /// Description of the corruption.
        message: String,
    },

    /// Positional access beyond the end of a typed buffer view.
    #[error("Index {index} out of range for buffer of {size} elements")]
    IndexOutOfRange {
        /// The requested element index.
        index: usize,
        /// Number of elements in the view.
        size: usize,
    },
}

/// Result type alias for OxiSeis operations.
pub type Result<T> = std::result::Result<T, OxiSeisError>;

impl OxiSeisError {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    /// Create a buffer too small error.
    pub fn buffer_too_small(needed: usize, available: usize) -> Self {
        Self::BufferTooSmall { needed, available }
    }

    /// Create an invalid cookie error.
    pub fn invalid_cookie(found: i32) -> Self {
        Self::InvalidCookie { found }
    }

    /// Create a corrupted data error.
    pub fn corrupted(offset: usize, message: impl Into<String>) -> Self {
        Self::Corrupted {
            offset,
            message: message.into(),
        }
    }

    /// Create an index out of range error.
    pub fn out_of_range(index: usize, size: usize) -> Self {
        Self::IndexOutOfRange { index, size }
    }

    /// True for errors that mean the input was damaged or not ours.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::InvalidCookie { .. } | Self::Corrupted { .. } | Self::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OxiSeisError::invalid_parameter("distortion", "must be positive");
        assert!(err.to_string().contains("distortion"));

        let err = OxiSeisError::buffer_too_small(100, 10);
        assert!(err.to_string().contains("need 100"));

        let err = OxiSeisError::invalid_cookie(0x1234);
        assert!(err.to_string().contains("0x1234"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::InvalidData, "bad zlib stream");
        let err: OxiSeisError = io_err.into();
        assert!(matches!(err, OxiSeisError::Io(_)));
        assert!(err.is_corruption());
    }

    #[test]
    fn test_corruption_classification() {
        assert!(OxiSeisError::corrupted(4, "truncated").is_corruption());
        assert!(!OxiSeisError::buffer_too_small(1, 0).is_corruption());
        assert!(!OxiSeisError::out_of_range(3, 2).is_corruption());
    }
}
