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
//! Codec for the metadata of a single Tar archive entry.
//!
//! A Tar archive is a sequence of 512-byte blocks. Each entry starts with a
//! header block that describes the file (name, permissions, ownership,
//! size, timestamps, link target, device numbers). This crate translates
//! between such a header block and a [`TarEntry`]. Reading and writing the
//! archive stream, PAX extended header text and compression are left to
//! the caller.
//!
//! Supported header layouts:
//! - pre-POSIX (v7) headers without magic
//! - POSIX ustar, including the 155 byte name prefix
//! - GNU oldgnu, including the extended flag and real size of sparse files
//! - xstar, including its 131 byte name prefix
//!
//! Numbers too large for octal text can be written in the binary (base-256)
//! form understood by GNU tar and star. Text fields are encoded with an
//! [`encoding_rs::Encoding`] of the caller's choice, passed as `&UTF_8` and
//! so on.
//!
//! [This link](https://www.gnu.org/software/tar/manual/html_section/Formats.html) gives a good
//! overview over possible archive formats and their limitations.
//!
//! ```
//! use tar_entry::{default_encoding, TarEntry, BLOCKSIZE};
//!
//! let mut entry = TarEntry::new("docs/readme.txt");
//! entry.set_size(12).unwrap();
//!
//! let mut block = [0; BLOCKSIZE];
//! entry.write_header(&mut block, default_encoding(), false).unwrap();
//!
//! let parsed = TarEntry::from_header(&block, default_encoding()).unwrap();
//! assert_eq!(parsed.name(), "docs/readme.txt");
//! assert_eq!(parsed.size(), 12);
//! assert!(parsed.is_checksum_ok());
//! ```

#![deny(rustdoc::all)]
#![allow(rustdoc::missing_doc_code_examples)]
#![deny(clippy::all)]
#![deny(missing_debug_implementations)]

/// Each Archive Entry (either Header or Data Block) is a block of 512 bytes.
pub const BLOCKSIZE: usize = 512;

mod encoding;
mod entry;
mod error;
mod header;
mod path;
mod sparse;
mod tar_format_types;

pub use encoding::*;
pub use entry::*;
pub use error::*;
pub use header::*;
pub use path::*;
pub use sparse::*;
pub use tar_format_types::*;
