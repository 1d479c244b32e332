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
//! Text fields of a Tar header and the encodings they are stored in.
//!
//! Tar itself does not record which encoding names are written in. The
//! caller chooses one through [`TextEncoding`], which is implemented for
//! the `&'static` [`encoding_rs::Encoding`] statics (pass `&UTF_8`) and for
//! the permissive [`FallbackEncoding`]. Encodings that can't be written
//! back as themselves, such as UTF-16, are rejected.

use crate::error::{Result, TarError};
use std::borrow::Cow;

/// Converts between strings and the bytes stored in a header.
pub trait TextEncoding {
    /// Name of the encoding for error messages.
    fn name(&self) -> &'static str;

    /// Encodes `text`.
    ///
    /// # Errors
    /// Returns [`TarError::UnsupportedEncoding`] if `text` contains
    /// characters that this encoding can't represent.
    fn encode<'a>(&self, text: &'a str) -> Result<Cow<'a, [u8]>>;

    /// Decodes `bytes`.
    ///
    /// # Errors
    /// Returns [`TarError::UnsupportedEncoding`] if `bytes` is malformed in
    /// this encoding.
    fn decode<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, str>>;
}

impl TextEncoding for &'static encoding_rs::Encoding {
    fn name(&self) -> &'static str {
        encoding_rs::Encoding::name(*self)
    }

    fn encode<'a>(&self, text: &'a str) -> Result<Cow<'a, [u8]>> {
        let encoding = *self;
        if !is_symmetric(encoding) {
            return Err(TarError::unsupported_encoding(TextEncoding::name(self), text));
        }
        let (bytes, _, had_unmappable) = encoding_rs::Encoding::encode(encoding, text);
        if had_unmappable {
            return Err(TarError::unsupported_encoding(TextEncoding::name(self), text));
        }
        Ok(bytes)
    }

    fn decode<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, str>> {
        let encoding = *self;
        let decoded = if is_symmetric(encoding) {
            encoding_rs::Encoding::decode_without_bom_handling_and_without_replacement(
                encoding, bytes,
            )
        } else {
            None
        };
        decoded.ok_or_else(|| {
            TarError::unsupported_encoding(TextEncoding::name(self), String::from_utf8_lossy(bytes))
        })
    }
}

// UTF-16 and "replacement" encode as UTF-8 but decode as themselves, so a
// name written with them would not read back.
fn is_symmetric(encoding: &'static encoding_rs::Encoding) -> bool {
    encoding.output_encoding() == encoding
}

/// Maps every byte to the code point of the same value and back. Decoding
/// never fails, encoding replaces characters above U+00FF with `?`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FallbackEncoding;

impl TextEncoding for FallbackEncoding {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn encode<'a>(&self, text: &'a str) -> Result<Cow<'a, [u8]>> {
        if text.is_ascii() {
            return Ok(Cow::Borrowed(text.as_bytes()));
        }
        Ok(text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect())
    }

    fn decode<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, str>> {
        if bytes.is_ascii() {
            // ASCII is valid UTF-8
            return Ok(String::from_utf8_lossy(bytes));
        }
        Ok(Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()))
    }
}

/// The encoding used when the caller does not pick one: UTF-8.
#[must_use]
pub fn default_encoding() -> &'static dyn TextEncoding {
    &encoding_rs::UTF_8
}

/// Decodes a NUL terminated (or field filling) text field.
///
/// # Errors
/// Returns [`TarError::UnsupportedEncoding`] if the bytes are malformed in
/// `encoding`.
pub fn parse_name(field: &[u8], encoding: &dyn TextEncoding) -> Result<String> {
    let len = memchr::memchr(0, field).unwrap_or(field.len());
    encoding.decode(&field[..len]).map(Cow::into_owned)
}

/// Encodes `text` into `buf` and pads the rest of `buf` with NUL bytes.
/// Text that does not fit is shortened one character at a time until its
/// encoded form does. Returns the number of text bytes written.
///
/// # Errors
/// Returns [`TarError::UnsupportedEncoding`] if `text` can't be represented
/// in `encoding`.
pub fn format_name_bytes(text: &str, buf: &mut [u8], encoding: &dyn TextEncoding) -> Result<usize> {
    let mut end = text.len();
    let mut bytes = encoding.encode(text)?;
    while bytes.len() > buf.len() {
        end = text[..end]
            .char_indices()
            .next_back()
            .map_or(0, |(i, _)| i);
        bytes = encoding.encode(&text[..end])?;
    }
    buf[..bytes.len()].copy_from_slice(&bytes);
    buf[bytes.len()..].fill(0);
    Ok(bytes.len())
}
