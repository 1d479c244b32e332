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
//! Layout of the 512 byte Tar header record.
//!
//! All formats share the fields up to and including `devminor` (offsets
//! 0..345). The remaining bytes differ:
//!
//! | format  | bytes 345..512                                                  |
//! |---------|-----------------------------------------------------------------|
//! | v7      | unused, zero filled                                             |
//! | ustar   | `prefix[155]`, padding                                          |
//! | oldgnu  | `atime ctime offset longnames pad sparse[4] isextended realsize` |
//! | xstar   | `prefix[131] atime ctime`, padding, `"tar\0"` at offset 508     |
//!
//! An overview of the formats can be found here:
//! <https://www.gnu.org/software/tar/manual/html_node/Formats.html#Formats>

#![allow(non_upper_case_globals)]

use crate::BLOCKSIZE;
use core::fmt::{Display, Formatter};

/// A fixed width field of the header record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Field {
    /// Name used in error messages.
    pub name: &'static str,
    /// Byte offset inside the record.
    pub offset: usize,
    /// Width in bytes.
    pub len: usize,
}

impl Field {
    const fn new(name: &'static str, offset: usize, len: usize) -> Self {
        Self { name, offset, len }
    }

    /// Exclusive end offset.
    #[must_use]
    pub const fn end(self) -> usize {
        self.offset + self.len
    }

    /// The bytes of this field inside `header`.
    #[must_use]
    pub fn slice(self, header: &[u8; BLOCKSIZE]) -> &[u8] {
        &header[self.offset..self.end()]
    }

    /// The bytes of this field inside `header`, mutable.
    pub fn slice_mut(self, header: &mut [u8; BLOCKSIZE]) -> &mut [u8] {
        &mut header[self.offset..self.end()]
    }
}

pub const NAME: Field = Field::new("name", 0, 100);
pub const MODE: Field = Field::new("mode", 100, 8);
pub const UID: Field = Field::new("uid", 108, 8);
pub const GID: Field = Field::new("gid", 116, 8);
pub const SIZE: Field = Field::new("size", 124, 12);
pub const MTIME: Field = Field::new("mtime", 136, 12);
pub const CHKSUM: Field = Field::new("chksum", 148, 8);
pub const TYPEFLAG: Field = Field::new("typeflag", 156, 1);
pub const LINKNAME: Field = Field::new("linkname", 157, 100);
pub const MAGIC: Field = Field::new("magic", 257, 6);
pub const VERSION: Field = Field::new("version", 263, 2);
pub const UNAME: Field = Field::new("uname", 265, 32);
pub const GNAME: Field = Field::new("gname", 297, 32);
pub const DEVMAJOR: Field = Field::new("devmajor", 329, 8);
pub const DEVMINOR: Field = Field::new("devminor", 337, 8);

/// ustar only.
pub const PREFIX: Field = Field::new("prefix", 345, 155);

// oldgnu tail
pub const GNU_ATIME: Field = Field::new("atime", 345, 12);
pub const GNU_CTIME: Field = Field::new("ctime", 357, 12);
pub const GNU_OFFSET: Field = Field::new("offset", 369, 12);
pub const GNU_LONGNAMES: Field = Field::new("longnames", 381, 4);
/// Four sparse map entries of 24 bytes each. Consumed by the sparse stream
/// reader, not by this crate.
pub const GNU_SPARSE: Field = Field::new("sparse", 386, 96);
pub const GNU_ISEXTENDED: Field = Field::new("isextended", 482, 1);
pub const GNU_REALSIZE: Field = Field::new("realsize", 483, 12);

// xstar tail
pub const XSTAR_PREFIX: Field = Field::new("prefix", 345, 131);
pub const XSTAR_ATIME: Field = Field::new("atime", 476, 12);
pub const XSTAR_CTIME: Field = Field::new("ctime", 488, 12);
pub const XSTAR_MAGIC: Field = Field::new("xmagic", 508, 4);

/// Magic of POSIX ustar headers, stored with the version `"00"`.
pub const MAGIC_POSIX: &[u8; 6] = b"ustar\0";
pub const VERSION_POSIX: &[u8; 2] = b"00";
/// Magic of old GNU headers, stored with the version `" \0"`.
pub const MAGIC_GNU: &[u8; 6] = b"ustar ";
pub const VERSION_GNU_SPACE: &[u8; 2] = b" \0";
/// Secondary magic of xstar headers at the end of the record.
pub const MAGIC_XSTAR: &[u8; 4] = b"tar\0";

/// The header layouts this crate understands. They share the fields up to
/// `devminor` and differ in how the tail of the record is used.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TarFormat {
    /// Pre-POSIX (v7) header without any magic.
    Legacy,
    /// POSIX.1-1988 ustar header with a 155 byte name prefix.
    Posix,
    /// GNU `oldgnu` header with timestamps and a sparse map in the tail.
    OldGnu,
    /// ustar compatible header written by `star`, with a shorter prefix.
    Xstar,
}

impl TarFormat {
    /// Classifies a header record by its magic bytes.
    #[must_use]
    pub fn detect(header: &[u8; BLOCKSIZE]) -> Self {
        let magic = MAGIC.slice(header);
        let format = if magic == MAGIC_GNU {
            Self::OldGnu
        } else if magic == MAGIC_POSIX {
            if XSTAR_MAGIC.slice(header) == MAGIC_XSTAR {
                Self::Xstar
            } else {
                Self::Posix
            }
        } else {
            Self::Legacy
        };
        log::debug!("header magic {:?} => {format:?}", magic.escape_ascii().to_string());
        format
    }

    /// The layout to use when writing an entry with the given magic and
    /// version. xstar is never chosen, as it can't be told apart from ustar
    /// by magic and version alone.
    #[must_use]
    pub fn from_magic(magic: &str, version: &str) -> Self {
        match (magic.as_bytes(), version.as_bytes()) {
            (b"ustar ", _) => Self::OldGnu,
            (b"ustar", b"00") => Self::Posix,
            _ => Self::Legacy,
        }
    }
}

/// The typeflag byte was not one of the known [`TypeFlag`]s.
#[derive(Copy, Clone, Debug, PartialOrd, PartialEq, Eq)]
pub struct InvalidTypeFlagError(pub u8);

impl Display for InvalidTypeFlagError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{:#04x} is not a valid TypeFlag", self.0))
    }
}

impl std::error::Error for InvalidTypeFlagError {}

/// Describes the kind of payload that follows a header. Unknown flags are
/// kept verbatim by [`crate::TarEntry`], this enum only names the known
/// ones.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(non_camel_case_types)]
pub enum TypeFlag {
    /// Regular file.
    REGTYPE = b'0',
    /// Regular file, as written by pre-POSIX archivers. A legacy regular
    /// file whose name ends with a slash is a directory.
    AREGTYPE = b'\0',
    /// Hard link to a file archived before. The target is in `linkname`.
    LNKTYPE = b'1',
    /// Symbolic link. The target is in `linkname`.
    SYMTYPE = b'2',
    /// Character special file, see `devmajor` and `devminor`.
    CHRTYPE = b'3',
    /// Block special file, see `devmajor` and `devminor`.
    BLKTYPE = b'4',
    /// Directory. The name should end with a slash.
    DIRTYPE = b'5',
    /// FIFO special file. Only its existence is archived.
    FIFOTYPE = b'6',
    /// Contiguous file. Treated as a regular file where unsupported.
    CONTTYPE = b'7',
    /// GNU meta entry whose data is the long link name of the next entry.
    GNU_LONGLINK = b'K',
    /// GNU meta entry whose data is the long name of the next entry.
    GNU_LONGNAME = b'L',
    /// Old GNU sparse file.
    GNU_SPARSE = b'S',
    /// PAX extended header referring to the next entry.
    XHDTYPE = b'x',
    /// PAX extended header as written by Solaris tar.
    SOLARIS_XHDTYPE = b'X',
    /// PAX global extended header.
    XGLTYPE = b'g',
}

impl TypeFlag {
    /// Whether we have a regular file.
    #[must_use]
    pub fn is_regular_file(self) -> bool {
        self == Self::AREGTYPE || self == Self::REGTYPE
    }

    /// Whether this is a PAX extended header for the next entry.
    #[must_use]
    pub fn is_pax_header(self) -> bool {
        self == Self::XHDTYPE || self == Self::SOLARIS_XHDTYPE
    }
}

impl From<TypeFlag> for u8 {
    fn from(flag: TypeFlag) -> Self {
        flag as u8
    }
}

impl TryFrom<u8> for TypeFlag {
    type Error = InvalidTypeFlagError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            b'0' => Ok(Self::REGTYPE),
            b'\0' => Ok(Self::AREGTYPE),
            b'1' => Ok(Self::LNKTYPE),
            b'2' => Ok(Self::SYMTYPE),
            b'3' => Ok(Self::CHRTYPE),
            b'4' => Ok(Self::BLKTYPE),
            b'5' => Ok(Self::DIRTYPE),
            b'6' => Ok(Self::FIFOTYPE),
            b'7' => Ok(Self::CONTTYPE),
            b'K' => Ok(Self::GNU_LONGLINK),
            b'L' => Ok(Self::GNU_LONGNAME),
            b'S' => Ok(Self::GNU_SPARSE),
            b'x' => Ok(Self::XHDTYPE),
            b'X' => Ok(Self::SOLARIS_XHDTYPE),
            b'g' => Ok(Self::XGLTYPE),
            e => Err(InvalidTypeFlagError(e)),
        }
    }
}

bitflags::bitflags! {
    /// UNIX file permissions. The file type bits of a mode (e.g. `0o40000`
    /// for directories) are not part of this set.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModeFlags: u32 {
        /// Set UID on execution.
        const SetUID = 0o4000;
        /// Set GID on execution.
        const SetGID = 0o2000;
        /// Sticky bit.
        const TSVTX = 0o1000;
        /// Owner read.
        const OwnerRead = 0o400;
        /// Owner write.
        const OwnerWrite = 0o200;
        /// Owner execute.
        const OwnerExec = 0o100;
        /// Group read.
        const GroupRead = 0o040;
        /// Group write.
        const GroupWrite = 0o020;
        /// Group execute.
        const GroupExec = 0o010;
        /// Others read.
        const OthersRead = 0o004;
        /// Others write.
        const OthersWrite = 0o002;
        /// Others execute.
        const OthersExec = 0o001;
    }
}
