/*
MIT License

Copyright (c) 2023 Philipp Schuster

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/
//! Error type shared by all codecs of this crate.

use std::io;
use thiserror::Error;

/// Everything that can go wrong while reading or writing an entry header.
#[derive(Debug, Error)]
pub enum TarError {
    /// A numeric header field holds neither octal text nor a valid binary
    /// (base-256) encoding.
    #[error("invalid header field `{field}`: {reason}")]
    InvalidHeaderField {
        /// Name of the header field.
        field: &'static str,
        /// What was wrong with its bytes.
        reason: String,
    },

    /// A text field cannot be represented in (or decoded from) the
    /// requested text encoding.
    #[error("text {text:?} is not representable in encoding {encoding}")]
    UnsupportedEncoding {
        /// Name of the encoding.
        encoding: &'static str,
        /// The offending text, lossily rendered.
        text: String,
    },

    /// A setter received a value outside of its domain.
    #[error("{what} is out of range: {value}")]
    InvalidArgument {
        /// The attribute that was set.
        what: &'static str,
        /// The rejected value.
        value: i64,
    },

    /// A numeric value does not fit its field, not even in binary form.
    #[error("value {value} does not fit into a {width} byte field")]
    ValueOutOfRange {
        /// The value that should have been written.
        value: i128,
        /// Width of the field in bytes.
        width: usize,
    },

    /// A key required by a sparse dialect is absent from the extended header.
    #[error("extended header lacks required key `{0}`")]
    MissingExtendedHeaderKey(&'static str),

    /// An extended header value that must be a decimal number is not one.
    #[error("extended header key `{key}` has non-numeric value {value:?}")]
    InvalidExtendedHeaderValue {
        /// The extended header key.
        key: &'static str,
        /// The malformed value.
        value: String,
    },

    /// The permissive fallback encoding failed. It never should.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error while inspecting a bound file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias used throughout this crate.
pub type Result<T> = core::result::Result<T, TarError>;

impl TarError {
    /// Create an invalid header field error.
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidHeaderField {
            field,
            reason: reason.into(),
        }
    }

    /// Create an unsupported encoding error.
    pub fn unsupported_encoding(encoding: &'static str, text: impl Into<String>) -> Self {
        Self::UnsupportedEncoding {
            encoding,
            text: text.into(),
        }
    }

    /// True for errors that a retry under the fallback encoding can cure.
    pub const fn is_encoding_error(&self) -> bool {
        matches!(self, Self::UnsupportedEncoding { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TarError::invalid_field("size", "non-octal digit '9'");
        assert!(err.to_string().contains("`size`"));
        assert!(err.to_string().contains("'9'"));

        let err = TarError::InvalidArgument {
            what: "size",
            value: -1,
        };
        assert_eq!(err.to_string(), "size is out of range: -1");
    }

    #[test]
    fn test_encoding_error_classification() {
        assert!(TarError::unsupported_encoding("ISO-8859-2", "€").is_encoding_error());
        assert!(!TarError::Internal("x".into()).is_encoding_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: TarError = io_err.into();
        assert!(matches!(err, TarError::Io(_)));
    }
}
