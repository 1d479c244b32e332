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
//! Sparse file metadata from PAX extended headers.
//!
//! The PAX text format itself is parsed elsewhere. The hooks here take the
//! resulting key/value pairs and mark the entry as sparse, setting its
//! logical size and, depending on the dialect, its name.

use crate::entry::TarEntry;
use crate::error::{Result, TarError};
use num_traits::Num;
use std::collections::HashMap;

const GNU_SPARSE_SIZE: &str = "GNU.sparse.size";
const GNU_SPARSE_REALSIZE: &str = "GNU.sparse.realsize";
const GNU_SPARSE_NAME: &str = "GNU.sparse.name";
const SCHILY_REALSIZE: &str = "SCHILY.realsize";

/// The ways sparse files are described in PAX extended headers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SparseDialect {
    /// GNU tar PAX format 0.0 and 0.1.
    GnuPax0x,
    /// GNU tar PAX format 1.0.
    GnuPax1x,
    /// star.
    Star,
}

impl TarEntry {
    /// Applies the sparse keys of `headers` in the given dialect.
    ///
    /// # Errors
    /// See [`Self::fill_gnu_sparse_0x_data`], [`Self::fill_gnu_sparse_1x_data`]
    /// and [`Self::fill_star_sparse_data`].
    pub fn merge_sparse_headers(
        &mut self,
        dialect: SparseDialect,
        headers: &HashMap<String, String>,
    ) -> Result<()> {
        match dialect {
            SparseDialect::GnuPax0x => self.fill_gnu_sparse_0x_data(headers),
            SparseDialect::GnuPax1x => self.fill_gnu_sparse_1x_data(headers),
            SparseDialect::Star => self.fill_star_sparse_data(headers),
        }
    }

    /// GNU sparse format 0.x. The header's name field holds sparse map data
    /// in this format, so `GNU.sparse.name` replaces the name if present.
    ///
    /// # Errors
    /// Fails if `GNU.sparse.size` is missing or not a number. The entry is
    /// left unchanged then.
    pub fn fill_gnu_sparse_0x_data(&mut self, headers: &HashMap<String, String>) -> Result<()> {
        let real_size = required_decimal(headers, GNU_SPARSE_SIZE)?;
        log::trace!("GNU sparse 0.x: {:?} has real size {real_size}", self.name);
        self.pax_gnu_sparse = true;
        self.real_size = real_size;
        if let Some(name) = headers.get(GNU_SPARSE_NAME) {
            self.name.clone_from(name);
        }
        Ok(())
    }

    /// GNU sparse format 1.x. Both the real size and the name are required.
    ///
    /// # Errors
    /// Fails if `GNU.sparse.realsize` is missing or not a number, or if
    /// `GNU.sparse.name` is missing. The entry is left unchanged then.
    pub fn fill_gnu_sparse_1x_data(&mut self, headers: &HashMap<String, String>) -> Result<()> {
        let real_size = required_decimal(headers, GNU_SPARSE_REALSIZE)?;
        let name = headers
            .get(GNU_SPARSE_NAME)
            .ok_or(TarError::MissingExtendedHeaderKey(GNU_SPARSE_NAME))?;
        log::trace!("GNU sparse 1.x: {name:?} has real size {real_size}");
        self.pax_gnu_sparse = true;
        self.real_size = real_size;
        self.name.clone_from(name);
        Ok(())
    }

    /// star sparse format. `SCHILY.realsize` is optional.
    ///
    /// # Errors
    /// Fails if `SCHILY.realsize` is present but not a number. The entry is
    /// left unchanged then.
    pub fn fill_star_sparse_data(&mut self, headers: &HashMap<String, String>) -> Result<()> {
        let real_size = headers
            .get(SCHILY_REALSIZE)
            .map(|value| parse_decimal::<u64>(SCHILY_REALSIZE, value))
            .transpose()?;
        log::trace!("star sparse: {:?} has real size {real_size:?}", self.name);
        self.star_sparse = true;
        if let Some(real_size) = real_size {
            self.real_size = real_size;
        }
        Ok(())
    }
}

fn required_decimal<T: Num>(headers: &HashMap<String, String>, key: &'static str) -> Result<T> {
    let value = headers
        .get(key)
        .ok_or(TarError::MissingExtendedHeaderKey(key))?;
    parse_decimal(key, value)
}

fn parse_decimal<T: Num>(key: &'static str, value: &str) -> Result<T> {
    T::from_str_radix(value, 10).map_err(|_| TarError::InvalidExtendedHeaderValue {
        key,
        value: value.to_owned(),
    })
}
