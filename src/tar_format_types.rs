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
//! Codec for the numeric fields of a Tar header.
//!
//! Numbers are stored as octal ASCII text. Values that do not fit the
//! octal range of a field may be stored in the GNU base-256 form instead:
//! the first byte has its high bit set (`0x80` for positive, `0xff` for
//! negative numbers) and the field holds a big-endian two's-complement
//! integer. Octal text never has the high bit set, which is how the two
//! encodings are told apart when reading.

use crate::error::{Result, TarError};
use crate::header::CHKSUM;
use num_traits::Num;

/// Largest value that fits a field of `width` bytes as octal text, i.e.
/// `8^(width-1) - 1`. The last byte is reserved for the terminator. Widths
/// beyond 21 bytes saturate at `i64::MAX`.
#[must_use]
pub const fn max_octal(width: usize) -> i64 {
    match width {
        0 | 1 => 0,
        2..=21 => (1_i64 << (3 * (width - 1))) - 1,
        _ => i64::MAX,
    }
}

/// Parses a field holding octal ASCII text.
///
/// Leading spaces are skipped and trailing NUL bytes and spaces are
/// ignored. A field starting with a NUL byte is zero.
///
/// # Errors
/// Returns [`TarError::InvalidHeaderField`] if the text contains anything
/// but octal digits or does not fit into an `i64`.
pub fn parse_octal(field: &'static str, bytes: &[u8]) -> Result<i64> {
    if bytes.len() < 2 {
        return Err(TarError::invalid_field(
            field,
            format!("length {} is too short", bytes.len()),
        ));
    }
    if bytes[0] == 0 {
        return Ok(0);
    }

    let start = bytes
        .iter()
        .position(|&b| b != b' ')
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|&b| b != 0 && b != b' ')
        .map_or(start, |i| i + 1);

    let digits = &bytes[start..end];
    if let Some(&byte) = digits.iter().find(|b| !(b'0'..=b'7').contains(*b)) {
        return Err(TarError::invalid_field(
            field,
            format!(
                "byte {byte:#04x} is not an octal digit in {:?}",
                String::from_utf8_lossy(bytes)
            ),
        ));
    }
    if digits.is_empty() {
        return Ok(0);
    }
    // only ASCII digits are left at this point
    let digits =
        core::str::from_utf8(digits).map_err(|e| TarError::invalid_field(field, e.to_string()))?;
    <i64 as Num>::from_str_radix(digits, 8)
        .map_err(|e| TarError::invalid_field(field, format!("octal value {digits}: {e}")))
}

/// Parses a numeric field that is either octal text or base-256 binary.
///
/// # Errors
/// Returns [`TarError::InvalidHeaderField`] for malformed octal text or
/// binary values that exceed the range of an `i64`.
pub fn parse_octal_or_binary(field: &'static str, bytes: &[u8]) -> Result<i64> {
    match bytes.first() {
        Some(&lead) if lead & 0x80 != 0 => parse_binary(field, bytes),
        _ => parse_octal(field, bytes),
    }
}

fn parse_binary(field: &'static str, bytes: &[u8]) -> Result<i64> {
    // the two's complement of the whole field must fit an i128
    if bytes.len() > 15 {
        return Err(TarError::invalid_field(field, "binary field is too wide"));
    }
    let negative = bytes[0] == 0xff;
    let mut value = i128::from(bytes[0] & 0x7f);
    for &byte in &bytes[1..] {
        value = (value << 8) | i128::from(byte);
    }
    if negative {
        value -= 1_i128 << (bytes.len() * 8 - 1);
    }
    i64::try_from(value)
        .map_err(|_| TarError::invalid_field(field, format!("binary value {value} exceeds 64 bits")))
}

/// Writes `value` as zero padded octal digits followed by a single NUL byte.
/// Digits that do not fit are dropped from the front, so callers check the
/// range with [`max_octal`] first.
pub fn format_octal(value: u64, buf: &mut [u8]) {
    let Some((terminator, digits)) = buf.split_last_mut() else {
        return;
    };
    *terminator = 0;
    write_octal_digits(value, digits);
}

fn write_octal_digits(mut value: u64, digits: &mut [u8]) {
    for slot in digits.iter_mut().rev() {
        *slot = b'0' + (value & 7) as u8;
        value >>= 3;
    }
}

/// Writes `value` as octal text when it fits the field and in base-256
/// binary form otherwise.
///
/// # Errors
/// Returns [`TarError::ValueOutOfRange`] if the value does not even fit the
/// binary form, which has `8 * (width - 1)` bits of payload.
pub fn format_octal_or_binary(value: i128, buf: &mut [u8]) -> Result<()> {
    if buf.is_empty() {
        return Err(TarError::ValueOutOfRange { value, width: 0 });
    }
    if (0..=i128::from(max_octal(buf.len()))).contains(&value) {
        format_octal(value as u64, buf);
        return Ok(());
    }
    format_binary(value, buf)
}

fn format_binary(value: i128, buf: &mut [u8]) -> Result<()> {
    let width = buf.len();
    if width == 0 || width > 15 {
        return Err(TarError::ValueOutOfRange { value, width });
    }
    let limit = 1_i128 << ((width - 1) * 8);
    if value >= limit || value < -limit {
        return Err(TarError::ValueOutOfRange { value, width });
    }

    let raw = if value < 0 {
        (value + (1_i128 << (width * 8))) as u128
    } else {
        value as u128
    };
    for (i, slot) in buf.iter_mut().rev().enumerate() {
        *slot = (raw >> (8 * i)) as u8;
    }
    buf[0] = if value < 0 { 0xff } else { 0x80 };
    Ok(())
}

/// Writes a numeric header field.
///
/// With `extended` set, out of range values are written in binary form.
/// Without it they degrade to an all zero octal field and the caller is
/// expected to carry the real value in a PAX extended header.
///
/// # Errors
/// Returns [`TarError::ValueOutOfRange`] for an empty `buf`, and in
/// `extended` mode as described for [`format_octal_or_binary`].
pub fn format_numeric_field(
    field: &'static str,
    value: i128,
    buf: &mut [u8],
    extended: bool,
) -> Result<()> {
    if buf.is_empty() {
        return Err(TarError::ValueOutOfRange { value, width: 0 });
    }
    if !extended && !(0..=i128::from(max_octal(buf.len()))).contains(&value) {
        log::warn!("{field}={value} does not fit {} octal digits, writing 0", buf.len() - 1);
        format_octal(0, buf);
        return Ok(());
    }
    format_octal_or_binary(value, buf)
}

/// Sum of the unsigned values of all bytes of `header`.
#[must_use]
pub fn compute_checksum(header: &[u8]) -> u64 {
    header.iter().map(|&b| u64::from(b)).sum()
}

/// Writes a checksum the traditional way: six octal digits, a NUL byte and
/// a space.
///
/// # Errors
/// Returns [`TarError::ValueOutOfRange`] if `buf` has no room for the two
/// terminating bytes.
pub fn format_checksum(value: u64, buf: &mut [u8]) -> Result<()> {
    let Some(digits) = buf.len().checked_sub(2) else {
        return Err(TarError::ValueOutOfRange {
            value: value.into(),
            width: buf.len(),
        });
    };
    write_octal_digits(value, &mut buf[..digits]);
    buf[digits] = 0;
    buf[digits + 1] = b' ';
    Ok(())
}

/// Checks the checksum stored in `header` against its content, treating
/// the checksum field itself as spaces.
///
/// Some historic implementations summed signed bytes, so a header is valid
/// if the stored value matches either the unsigned or the signed sum. Only
/// the first run of up to six octal digits of the field is considered.
#[must_use]
pub fn verify_checksum(header: &[u8]) -> bool {
    let mut stored: i64 = 0;
    let mut unsigned_sum: i64 = 0;
    let mut signed_sum: i64 = 0;
    let mut digits = 0;

    for (i, &raw) in header.iter().enumerate() {
        let mut byte = raw;
        if (CHKSUM.offset..CHKSUM.end()).contains(&i) {
            if (b'0'..=b'7').contains(&byte) && digits < 6 {
                digits += 1;
                stored = stored * 8 + i64::from(byte - b'0');
            } else if digits > 0 {
                digits = 6;
            }
            byte = b' ';
        }
        unsigned_sum += i64::from(byte);
        signed_sum += i64::from(byte as i8);
    }
    stored == unsigned_sum || stored == signed_sum
}
